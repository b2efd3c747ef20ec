//! CNN architecture for leaf disease classification
//!
//! A compact convolutional network: four conv blocks with max pooling,
//! global average pooling, and a two-layer classification head. Input is
//! expected as normalized `[batch, 3, 224, 224]` tensors.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the leaf disease classifier
#[derive(Config, Debug)]
pub struct LeafClassifierConfig {
    /// Number of output classes
    #[config(default = "6")]
    pub num_classes: usize,

    /// Number of input channels (RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filter count of the first conv block; later blocks double it
    #[config(default = "32")]
    pub base_filters: usize,

    /// Width of the hidden classification layer
    #[config(default = "256")]
    pub hidden_size: usize,

    /// Dropout rate applied before the final layer during training
    #[config(default = "0.3")]
    pub dropout_rate: f64,
}

/// Convolutional block: conv -> ReLU -> max pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new conv block with same-padding and 2x2 pooling
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let relu = Relu::new();
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self { conv, relu, pool }
    }

    /// Forward pass, halving spatial resolution
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Leaf disease classifier producing raw logits
#[derive(Module, Debug)]
pub struct LeafClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> LeafClassifier<B> {
    /// Create a new classifier with freshly initialized weights
    pub fn new(config: &LeafClassifierConfig, device: &B::Device) -> Self {
        let filters = config.base_filters;

        let conv1 = ConvBlock::new(config.in_channels, filters, 3, device);
        let conv2 = ConvBlock::new(filters, filters * 2, 3, device);
        let conv3 = ConvBlock::new(filters * 2, filters * 4, 3, device);
        let conv4 = ConvBlock::new(filters * 4, filters * 8, 3, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let fc1 = LinearConfig::new(filters * 8, config.hidden_size).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(config.hidden_size, config.num_classes).init(device);

        Self {
            conv1,
            conv2,
            conv3,
            conv4,
            global_pool,
            fc1,
            dropout,
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass producing logits of shape `[batch, num_classes]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(images);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = burn::tensor::activation::relu(x);
        let x = self.dropout.forward(x);

        self.fc2.forward(x)
    }

    /// Forward pass producing class probabilities
    pub fn forward_softmax(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(images);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Convert into an inference-ready model with dropout disabled.
    ///
    /// Dropout stays live on autodiff backends, so the rate is zeroed
    /// explicitly to keep repeated forward passes deterministic.
    pub fn into_inference(mut self) -> Self {
        self.dropout = DropoutConfig::new(0.0).init();
        self
    }
}
