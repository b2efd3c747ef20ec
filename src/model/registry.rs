//! Model registry: checkpoint loading and shared handles
//!
//! The registry owns one classifier per configured name, bound to the
//! default device and switched into inference mode. Checkpoint loading
//! never fails the registry: a missing or unreadable checkpoint logs a
//! warning and leaves the model on its initial weights, so the service
//! always comes up with a usable handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use tracing::{info, warn};

use crate::backend::{default_device, SaliencyBackend};
use crate::model::cnn::{LeafClassifier, LeafClassifierConfig};
use crate::model::weights::WeightMap;
use crate::utils::error::{LeafsightError, Result};

type Device = <SaliencyBackend as Backend>::Device;

/// Where a loaded model's weights came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightSource {
    /// No usable checkpoint; framework-initialized weights
    Initialized,
    /// Every parameter restored from the checkpoint
    Checkpoint,
    /// Some parameters restored, the rest left initialized
    Partial {
        restored: usize,
        missing: usize,
        unexpected: usize,
    },
}

impl std::fmt::Display for WeightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized => write!(f, "initial weights"),
            Self::Checkpoint => write!(f, "checkpoint weights"),
            Self::Partial {
                restored,
                missing,
                unexpected,
            } => write!(
                f,
                "partial checkpoint ({} restored, {} missing, {} unexpected)",
                restored, missing, unexpected
            ),
        }
    }
}

/// Shared handle to a loaded model.
///
/// The model sits behind a mutex so concurrent callers serialize their
/// forward passes; clones share the same underlying model.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    name: String,
    model: Arc<Mutex<LeafClassifier<SaliencyBackend>>>,
    source: WeightSource,
}

impl ModelHandle {
    fn new(name: String, model: LeafClassifier<SaliencyBackend>, source: WeightSource) -> Self {
        Self {
            name,
            model: Arc::new(Mutex::new(model)),
            source,
        }
    }

    /// Registry name of this model
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provenance of the model's weights
    pub fn source(&self) -> WeightSource {
        self.source
    }

    /// Lock the model for exclusive use during a prediction
    pub fn lock(&self) -> Result<MutexGuard<'_, LeafClassifier<SaliencyBackend>>> {
        self.model
            .lock()
            .map_err(|_| LeafsightError::Inference("model mutex poisoned".to_string()))
    }
}

/// Registry of named, ready-to-use models
#[derive(Debug, Default)]
pub struct ModelRegistry {
    handles: HashMap<String, ModelHandle>,
}

impl ModelRegistry {
    /// Load one model per named checkpoint path with the default
    /// architecture (224x224 input, 6 classes)
    pub fn load(paths: &HashMap<String, PathBuf>) -> Self {
        Self::load_with_config(paths, &LeafClassifierConfig::new())
    }

    /// Load one model per named checkpoint path with an explicit
    /// architecture configuration
    pub fn load_with_config(
        paths: &HashMap<String, PathBuf>,
        config: &LeafClassifierConfig,
    ) -> Self {
        let device = default_device();
        let mut handles = HashMap::new();

        for (name, path) in paths {
            let model = LeafClassifier::<SaliencyBackend>::new(config, &device).into_inference();
            let (model, source) = load_checkpoint(model, path, &device);
            info!("Model '{}' ready ({})", name, source);
            handles.insert(name.clone(), ModelHandle::new(name.clone(), model, source));
        }

        Self { handles }
    }

    /// Look up a model handle by name
    pub fn handle(&self, name: &str) -> Option<&ModelHandle> {
        self.handles.get(name)
    }

    /// Iterate over registered model names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// Number of registered models
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the registry has no models
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

fn load_checkpoint(
    model: LeafClassifier<SaliencyBackend>,
    path: &Path,
    device: &Device,
) -> (LeafClassifier<SaliencyBackend>, WeightSource) {
    if !path.exists() {
        warn!(
            "Checkpoint not found at '{}', using initial weights",
            path.display()
        );
        return (model, WeightSource::Initialized);
    }

    if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        return load_weight_map(model, path, device);
    }

    match model.clone().load_file(path, &CompactRecorder::new(), device) {
        Ok(loaded) => (loaded, WeightSource::Checkpoint),
        Err(e) => {
            warn!(
                "Failed to load checkpoint '{}': {}, using initial weights",
                path.display(),
                e
            );
            (model, WeightSource::Initialized)
        }
    }
}

fn load_weight_map(
    model: LeafClassifier<SaliencyBackend>,
    path: &Path,
    device: &Device,
) -> (LeafClassifier<SaliencyBackend>, WeightSource) {
    let map = match WeightMap::from_file(path) {
        Ok(map) => map,
        Err(e) => {
            warn!(
                "Failed to read weight map '{}': {}, using initial weights",
                path.display(),
                e
            );
            return (model, WeightSource::Initialized);
        }
    };

    let (model, report) = model.apply_weight_map(&map, device);

    for name in &report.missing {
        warn!("Checkpoint is missing weight '{}'", name);
    }
    for name in &report.unexpected {
        warn!("Checkpoint has unexpected weight '{}'", name);
    }

    if report.is_complete() && report.unexpected.is_empty() {
        (model, WeightSource::Checkpoint)
    } else {
        info!("Partial weight restore: {}", report.summary());
        let source = WeightSource::Partial {
            restored: report.restored.len(),
            missing: report.missing.len() + report.mismatched.len(),
            unexpected: report.unexpected.len(),
        };
        (model, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;

    fn small_config() -> LeafClassifierConfig {
        LeafClassifierConfig::new()
            .with_base_filters(2)
            .with_hidden_size(8)
    }

    fn registry_for(path: PathBuf) -> ModelRegistry {
        let mut paths = HashMap::new();
        paths.insert("base".to_string(), path);
        ModelRegistry::load_with_config(&paths, &small_config())
    }

    fn assert_usable(handle: &ModelHandle) {
        let device = default_device();
        let model = handle.lock().unwrap();
        let input = Tensor::<SaliencyBackend, 4>::ones([1, 3, 16, 16], &device);
        assert_eq!(model.forward(input).dims(), [1, 6]);
    }

    #[test]
    fn test_missing_checkpoint_yields_usable_model() {
        let registry = registry_for(PathBuf::from("/nonexistent/model.mpk"));

        let handle = registry.handle("base").unwrap();
        assert_eq!(handle.source(), WeightSource::Initialized);
        assert_usable(handle);
    }

    #[test]
    fn test_full_weight_map_loads_as_checkpoint() {
        let device = default_device();
        let source = LeafClassifier::<SaliencyBackend>::new(&small_config(), &device);
        let map = WeightMap::from_model(&source).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        map.to_file(&path).unwrap();

        let registry = registry_for(path);
        let handle = registry.handle("base").unwrap();
        assert_eq!(handle.source(), WeightSource::Checkpoint);
        assert_usable(handle);
    }

    #[test]
    fn test_partial_weight_map_loads_with_warnings() {
        let device = default_device();
        let source = LeafClassifier::<SaliencyBackend>::new(&small_config(), &device);
        let full = WeightMap::from_model(&source).unwrap();

        let mut partial = WeightMap::default();
        partial.insert(
            "fc2.weight".to_string(),
            full.get("fc2.weight").unwrap().clone(),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        partial.to_file(&path).unwrap();

        let registry = registry_for(path);
        let handle = registry.handle("base").unwrap();
        assert_eq!(
            handle.source(),
            WeightSource::Partial {
                restored: 1,
                missing: 11,
                unexpected: 0
            }
        );
        assert_usable(handle);
    }

    #[test]
    fn test_corrupt_checkpoint_falls_back_to_initial_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mpk");
        std::fs::write(&path, b"not a checkpoint").unwrap();

        let registry = registry_for(path);
        let handle = registry.handle("base").unwrap();
        assert_eq!(handle.source(), WeightSource::Initialized);
        assert_usable(handle);
    }

    #[test]
    fn test_unknown_name_is_none() {
        let registry = registry_for(PathBuf::from("/nonexistent/model.mpk"));
        assert!(registry.handle("other").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_handles_are_shared_between_clones() {
        let registry = registry_for(PathBuf::from("/nonexistent/model.mpk"));
        let first = registry.handle("base").unwrap().clone();
        let second = registry.handle("base").unwrap().clone();

        assert_eq!(first.name(), second.name());
        assert!(Arc::ptr_eq(&first.model, &second.model));
    }
}
