//! Classification forward pass and label resolution

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

use crate::inference::round2;
use crate::model::cnn::LeafClassifier;
use crate::taxonomy::{ClassLabel, TaxonomyTable};
use crate::utils::error::{LeafsightError, Result};

/// Result of a single classification forward pass
#[derive(Debug, Clone)]
pub struct Classification {
    /// Index of the predicted class
    pub class_index: usize,
    /// Resolved (leaf, disease) label
    pub label: ClassLabel,
    /// Predicted-class probability as a percentage, rounded to 2 decimals
    pub confidence: f64,
    /// Full probability distribution over classes
    pub probabilities: Vec<f32>,
}

/// Classify a preprocessed input tensor.
///
/// The forward pass runs on the gradient-free inner backend. The predicted
/// class is the softmax argmax; its probability becomes the confidence
/// percentage.
pub fn classify<B: AutodiffBackend>(
    model: &LeafClassifier<B>,
    input: Tensor<B::InnerBackend, 4>,
    taxonomy: &TaxonomyTable,
) -> Result<Classification> {
    let inner = model.valid();
    let probs = inner.forward_softmax(input);

    let probabilities: Vec<f32> = probs
        .into_data()
        .to_vec()
        .map_err(|e| LeafsightError::Inference(format!("probability readout failed: {:?}", e)))?;

    let (class_index, probability) = probabilities
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, p)| (index, *p))
        .ok_or_else(|| LeafsightError::Inference("empty probability vector".to_string()))?;

    let label = taxonomy.resolve(class_index);
    let confidence = round2(probability as f64 * 100.0);

    Ok(Classification {
        class_index,
        label,
        confidence,
        probabilities,
    })
}
