//! Input-gradient saliency
//!
//! Attribution is the gradient of the predicted-class logit with respect
//! to the input pixels: forward on a grad-tracked copy of the input,
//! backward from the class score, then per-pixel max of absolute channel
//! gradients, rescaled to `[0, 1]`.

use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use image::{imageops::FilterType, GrayImage, Luma};

use crate::model::cnn::LeafClassifier;
use crate::utils::error::{LeafsightError, Result};

/// Epsilon guarding the normalization denominator
pub const NORMALIZE_EPS: f32 = 1e-9;

/// Single-channel attribution grid with values in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct SaliencyGrid {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl SaliencyGrid {
    /// Build a grid from raw magnitudes, rescaling them to `[0, 1]`.
    ///
    /// A constant input collapses to all zeros.
    pub fn normalized(values: Vec<f32>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.is_empty() || values.len() != expected {
            return Err(LeafsightError::Inference(format!(
                "saliency buffer has {} values, expected {}",
                values.len(),
                expected
            )));
        }

        let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let range = max - min + NORMALIZE_EPS;
        let values = values.into_iter().map(|v| (v - min) / range).collect();

        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Grid width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major grid values
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at a pixel position
    pub fn value(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }

    /// Smallest value in the grid
    pub fn min(&self) -> f32 {
        self.values.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    /// Largest value in the grid
    pub fn max(&self) -> f32 {
        self.values
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Resample to a new resolution with bicubic filtering.
    ///
    /// Values stay in `[0, 1]` but are not re-normalized.
    pub fn resize(&self, width: u32, height: u32) -> SaliencyGrid {
        if width == self.width && height == self.height {
            return self.clone();
        }

        let gray = self.to_gray_image();
        let resized = image::imageops::resize(&gray, width, height, FilterType::CatmullRom);
        let values = resized.pixels().map(|p| p[0] as f32 / 255.0).collect();

        SaliencyGrid {
            width,
            height,
            values,
        }
    }

    /// Render the grid as an 8-bit grayscale image
    pub fn to_gray_image(&self) -> GrayImage {
        let mut image = GrayImage::new(self.width, self.height);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let value = self.value(x, y).clamp(0.0, 1.0);
            *pixel = Luma([(value * 255.0) as u8]);
        }
        image
    }
}

/// Compute the saliency grid for one prediction.
///
/// The input tensor is re-attached to a fresh autodiff graph, so the
/// caller's tensor and the classification pass stay gradient-free.
pub fn compute_saliency<B: AutodiffBackend>(
    model: &LeafClassifier<B>,
    input: Tensor<B::InnerBackend, 4>,
    class_index: usize,
) -> Result<SaliencyGrid> {
    let [_, _, height, width] = input.dims();

    if class_index >= model.num_classes() {
        return Err(LeafsightError::Inference(format!(
            "class index {} out of range for {} classes",
            class_index,
            model.num_classes()
        )));
    }

    let tracked = Tensor::<B, 4>::from_inner(input).require_grad();
    let logits = model.forward(tracked.clone());

    let score = logits.slice([0..1, class_index..class_index + 1]).sum();
    let grads = score.backward();

    let input_grad = tracked
        .grad(&grads)
        .ok_or_else(|| LeafsightError::Inference("no gradient reached the input".to_string()))?;

    let magnitude = input_grad.abs().max_dim(1).reshape([height, width]);
    let values: Vec<f32> = magnitude
        .into_data()
        .to_vec()
        .map_err(|e| LeafsightError::Inference(format!("saliency readout failed: {:?}", e)))?;

    SaliencyGrid::normalized(values, width as u32, height as u32)
}
