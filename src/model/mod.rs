//! Model architecture, checkpoints, and registry
//!
//! This module provides:
//! - `LeafClassifier`: the CNN used for disease classification
//! - `WeightMap`: named weight export with partial-match restore
//! - `ModelRegistry`: named, mutex-guarded handles to loaded models

pub mod cnn;
pub mod registry;
pub mod weights;

pub use cnn::{ConvBlock, LeafClassifier, LeafClassifierConfig};
pub use registry::{ModelHandle, ModelRegistry, WeightSource};
pub use weights::{TensorEntry, WeightLoadReport, WeightMap};
