//! Inference pipeline: preprocessing, classification, and explanation
//!
//! This module provides:
//! - Image preprocessing into normalized model input
//! - Classification with taxonomy label resolution
//! - Input-gradient saliency and severity estimation
//! - Heat overlay rendering for each prediction
//!
//! ## Failure handling
//!
//! `DiagnosisPipeline::predict` never fails: every error inside the
//! pipeline is logged and collapsed into a sentinel record, so one bad
//! image cannot take down the caller.

pub mod classify;
pub mod overlay;
pub mod preprocess;
pub mod saliency;
pub mod severity;

// Re-export main types for convenience
pub use classify::{classify, Classification};
pub use preprocess::{Preprocessor, IMAGENET_MEAN, IMAGENET_STD};
pub use saliency::{compute_saliency, SaliencyGrid};
pub use severity::{LeafMask, SeverityConfig, SeverityEstimator};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::backend::{default_device, DefaultBackend};
use crate::model::registry::ModelHandle;
use crate::taxonomy::TaxonomyTable;
use crate::utils::error::Result;

/// Marker value used for both labels of a sentinel record
const SENTINEL_LABEL: &str = "Error";

/// Round a percentage to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Outcome of one diagnosis, ready for serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Leaf (plant) type
    pub leaf: String,
    /// Disease name
    pub disease: String,
    /// Confidence percentage in `[0, 100]`
    pub confidence: f64,
    /// Severity percentage in `[0, 100]`
    pub severity: f64,
    /// Path of the rendered saliency overlay
    #[serde(rename = "saliency")]
    pub saliency_path: String,
}

impl PredictionRecord {
    /// Fallback record returned when the pipeline fails
    pub fn sentinel() -> Self {
        Self {
            leaf: SENTINEL_LABEL.to_string(),
            disease: SENTINEL_LABEL.to_string(),
            confidence: 0.0,
            severity: 0.0,
            saliency_path: String::new(),
        }
    }

    /// Whether this record is the failure sentinel
    pub fn is_sentinel(&self) -> bool {
        self.leaf == SENTINEL_LABEL && self.disease == SENTINEL_LABEL
    }
}

/// End-to-end diagnosis pipeline bound to one model handle.
///
/// The handle's mutex serializes concurrent predictions; the forward
/// pass, saliency backward pass, and severity estimation for one image
/// run as a unit.
#[derive(Debug, Clone)]
pub struct DiagnosisPipeline {
    handle: ModelHandle,
    preprocessor: Preprocessor,
    severity: SeverityEstimator,
    output_dir: PathBuf,
}

impl DiagnosisPipeline {
    /// Create a pipeline writing overlay artifacts under `output_dir`
    pub fn new(handle: ModelHandle, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            preprocessor: Preprocessor::new(),
            severity: SeverityEstimator::default(),
            output_dir: output_dir.into(),
        }
    }

    /// Replace the severity thresholds
    pub fn with_severity_config(mut self, config: SeverityConfig) -> Self {
        self.severity = SeverityEstimator::new(config);
        self
    }

    /// Replace the preprocessor
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Diagnose one image.
    ///
    /// Never fails: errors are logged and collapsed into the sentinel
    /// record instead of propagating.
    pub fn predict(&self, image_path: &Path, taxonomy: &TaxonomyTable) -> PredictionRecord {
        match self.run(image_path, taxonomy) {
            Ok(record) => record,
            Err(e) => {
                error!("Prediction failed for '{}': {}", image_path.display(), e);
                PredictionRecord::sentinel()
            }
        }
    }

    fn run(&self, image_path: &Path, taxonomy: &TaxonomyTable) -> Result<PredictionRecord> {
        let model = self.handle.lock()?;
        let device = default_device();

        let (input, original) = self
            .preprocessor
            .preprocess::<DefaultBackend>(image_path, &device)?;

        let classification = classify(&model, input.clone(), taxonomy)?;
        let grid = compute_saliency(&model, input, classification.class_index)?;
        let (severity, artifact) =
            self.severity
                .estimate(&grid, &original, &self.output_dir, image_path)?;

        info!(
            "Prediction for '{}': {} / {} ({:.2}% confidence, {:.2}% severity)",
            image_path.display(),
            classification.label.leaf,
            classification.label.disease,
            classification.confidence,
            severity
        );

        Ok(PredictionRecord {
            leaf: classification.label.leaf,
            disease: classification.label.disease,
            confidence: classification.confidence,
            severity,
            saliency_path: artifact.display().to_string(),
        })
    }
}
