//! # Leafsight
//!
//! Plant leaf disease diagnosis with saliency-based explanations, built on
//! the Burn deep learning framework.
//!
//! ## Features
//!
//! - CNN classifier over normalized 224x224 RGB input
//! - Checkpoint loading that degrades to initial weights instead of failing
//! - Input-gradient saliency with heat overlay rendering
//! - Disease severity estimation over a leaf mask
//! - CPU (NdArray) by default, optional WGPU backend
//!
//! ## Modules
//!
//! - `backend`: backend selection and device helpers
//! - `model`: CNN architecture, weight maps, and the model registry
//! - `inference`: the diagnosis pipeline from image file to record
//! - `taxonomy`: class index to (leaf, disease) label resolution
//! - `utils`: error types and logging setup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use std::path::{Path, PathBuf};
//!
//! use leafsight::{DiagnosisPipeline, ModelRegistry, TaxonomyTable};
//!
//! let taxonomy = TaxonomyTable::from_json_file(Path::new("models/classes.json"))?;
//!
//! let mut checkpoints = HashMap::new();
//! checkpoints.insert("base".to_string(), PathBuf::from("models/leaf_classifier.mpk"));
//! let registry = ModelRegistry::load(&checkpoints);
//!
//! let handle = registry.handle("base").unwrap().clone();
//! let pipeline = DiagnosisPipeline::new(handle, "static/saliency");
//!
//! let record = pipeline.predict(Path::new("uploads/leaf.jpg"), &taxonomy);
//! println!("{} / {} ({:.2}%)", record.leaf, record.disease, record.confidence);
//! ```

pub mod backend;
pub mod inference;
pub mod model;
pub mod taxonomy;
pub mod utils;

// Re-export commonly used types
pub use backend::{backend_name, default_device, DefaultBackend, SaliencyBackend};
pub use inference::{
    classify, compute_saliency, Classification, DiagnosisPipeline, LeafMask, PredictionRecord,
    Preprocessor, SaliencyGrid, SeverityConfig, SeverityEstimator,
};
pub use model::{
    LeafClassifier, LeafClassifierConfig, ModelHandle, ModelRegistry, TensorEntry,
    WeightLoadReport, WeightMap, WeightSource,
};
pub use taxonomy::{ClassLabel, TaxonomyTable};
pub use utils::error::{LeafsightError, Result};

/// Number of disease classes the default model predicts
pub const NUM_CLASSES: usize = 6;

/// Model input edge length in pixels
pub const IMAGE_SIZE: usize = 224;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
