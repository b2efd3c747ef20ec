//! Named weight map export and partial-match restore
//!
//! Checkpoints are stored as a flat JSON object mapping parameter names
//! (e.g. "conv1.conv.weight") to their shape and row-major f32 data. On
//! restore, each model parameter is matched by name: entries that are
//! missing, unexpected, or shape-incompatible are reported rather than
//! treated as fatal, so a partially matching checkpoint still yields a
//! usable model.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use burn::{
    module::Param,
    nn::{conv::Conv2d, Linear},
    tensor::{backend::Backend, Tensor, TensorData},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::cnn::LeafClassifier;
use crate::utils::error::{LeafsightError, Result};

/// Shape and raw data of a single exported tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorEntry {
    /// Tensor dimensions, outermost first
    pub shape: Vec<usize>,
    /// Row-major tensor values
    pub data: Vec<f32>,
}

/// Flat map from parameter name to exported tensor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightMap {
    tensors: BTreeMap<String, TensorEntry>,
}

impl WeightMap {
    /// Read a weight map from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the weight map to a JSON file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Export every parameter of a classifier under its canonical name
    pub fn from_model<B: Backend>(model: &LeafClassifier<B>) -> Result<Self> {
        let mut map = Self::default();

        export_conv2d(&mut map, "conv1.conv", &model.conv1.conv)?;
        export_conv2d(&mut map, "conv2.conv", &model.conv2.conv)?;
        export_conv2d(&mut map, "conv3.conv", &model.conv3.conv)?;
        export_conv2d(&mut map, "conv4.conv", &model.conv4.conv)?;
        export_linear(&mut map, "fc1", &model.fc1)?;
        export_linear(&mut map, "fc2", &model.fc2)?;

        Ok(map)
    }

    /// Insert an entry, replacing any previous one with the same name
    pub fn insert(&mut self, name: String, entry: TensorEntry) {
        self.tensors.insert(name, entry);
    }

    /// Look up an entry by parameter name
    pub fn get(&self, name: &str) -> Option<&TensorEntry> {
        self.tensors.get(name)
    }

    /// Iterate over all parameter names in the map
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Number of entries in the map
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// Outcome of a partial-match restore
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightLoadReport {
    /// Parameters restored from the checkpoint
    pub restored: Vec<String>,
    /// Model parameters with no checkpoint entry
    pub missing: Vec<String>,
    /// Checkpoint entries with no matching model parameter
    pub unexpected: Vec<String>,
    /// Entries whose shape did not match the model parameter
    pub mismatched: Vec<String>,
}

impl WeightLoadReport {
    /// True when every model parameter was restored
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "{} restored, {} missing, {} unexpected, {} mismatched",
            self.restored.len(),
            self.missing.len(),
            self.unexpected.len(),
            self.mismatched.len()
        )
    }
}

impl<B: Backend> LeafClassifier<B> {
    /// Restore parameters from a weight map by name.
    ///
    /// Parameters without a usable entry keep their current values. The
    /// returned report lists what was restored, missed, or skipped.
    pub fn apply_weight_map(
        mut self,
        map: &WeightMap,
        device: &B::Device,
    ) -> (Self, WeightLoadReport) {
        let mut report = WeightLoadReport::default();

        self.conv1.conv = restore_conv2d("conv1.conv", self.conv1.conv, map, &mut report, device);
        self.conv2.conv = restore_conv2d("conv2.conv", self.conv2.conv, map, &mut report, device);
        self.conv3.conv = restore_conv2d("conv3.conv", self.conv3.conv, map, &mut report, device);
        self.conv4.conv = restore_conv2d("conv4.conv", self.conv4.conv, map, &mut report, device);
        self.fc1 = restore_linear("fc1", self.fc1, map, &mut report, device);
        self.fc2 = restore_linear("fc2", self.fc2, map, &mut report, device);

        let handled: HashSet<&String> = report
            .restored
            .iter()
            .chain(report.missing.iter())
            .chain(report.mismatched.iter())
            .collect();
        for name in map.names() {
            if !handled.contains(&name.to_string()) {
                report.unexpected.push(name.to_string());
            }
        }

        (self, report)
    }
}

fn tensor_entry<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<TensorEntry> {
    let shape = tensor.dims().to_vec();
    let data = tensor
        .into_data()
        .to_vec()
        .map_err(|e| LeafsightError::Serialization(format!("tensor export failed: {:?}", e)))?;

    Ok(TensorEntry { shape, data })
}

fn export_conv2d<B: Backend>(map: &mut WeightMap, prefix: &str, conv: &Conv2d<B>) -> Result<()> {
    map.insert(
        format!("{}.weight", prefix),
        tensor_entry(conv.weight.val())?,
    );
    if let Some(bias) = &conv.bias {
        map.insert(format!("{}.bias", prefix), tensor_entry(bias.val())?);
    }
    Ok(())
}

fn export_linear<B: Backend>(map: &mut WeightMap, prefix: &str, linear: &Linear<B>) -> Result<()> {
    map.insert(
        format!("{}.weight", prefix),
        tensor_entry(linear.weight.val())?,
    );
    if let Some(bias) = &linear.bias {
        map.insert(format!("{}.bias", prefix), tensor_entry(bias.val())?);
    }
    Ok(())
}

fn restore_param<B: Backend, const D: usize>(
    name: &str,
    param: Param<Tensor<B, D>>,
    map: &WeightMap,
    report: &mut WeightLoadReport,
    device: &B::Device,
) -> Param<Tensor<B, D>> {
    let entry = match map.get(name) {
        Some(entry) => entry,
        None => {
            report.missing.push(name.to_string());
            return param;
        }
    };

    let expected = param.val().dims();
    let element_count: usize = entry.shape.iter().product();
    if entry.shape[..] != expected[..] || entry.data.len() != element_count {
        warn!(
            "Shape mismatch for '{}': checkpoint {:?}, model {:?}",
            name, entry.shape, expected
        );
        report.mismatched.push(name.to_string());
        return param;
    }

    let tensor: Tensor<B, D> =
        Tensor::from_data(TensorData::new(entry.data.clone(), entry.shape.clone()), device);
    report.restored.push(name.to_string());

    Param::from_tensor(tensor)
}

fn restore_conv2d<B: Backend>(
    prefix: &str,
    mut conv: Conv2d<B>,
    map: &WeightMap,
    report: &mut WeightLoadReport,
    device: &B::Device,
) -> Conv2d<B> {
    conv.weight = restore_param(
        &format!("{}.weight", prefix),
        conv.weight,
        map,
        report,
        device,
    );
    conv.bias = conv
        .bias
        .map(|bias| restore_param(&format!("{}.bias", prefix), bias, map, report, device));
    conv
}

fn restore_linear<B: Backend>(
    prefix: &str,
    mut linear: Linear<B>,
    map: &WeightMap,
    report: &mut WeightLoadReport,
    device: &B::Device,
) -> Linear<B> {
    linear.weight = restore_param(
        &format!("{}.weight", prefix),
        linear.weight,
        map,
        report,
        device,
    );
    linear.bias = linear
        .bias
        .map(|bias| restore_param(&format!("{}.bias", prefix), bias, map, report, device));
    linear
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cnn::LeafClassifierConfig;

    type TestBackend = burn::backend::NdArray;

    fn small_config() -> LeafClassifierConfig {
        LeafClassifierConfig::new()
            .with_base_filters(2)
            .with_hidden_size(8)
    }

    fn forward_values(model: &LeafClassifier<TestBackend>) -> Vec<f32> {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 3, 16, 16], &device);
        model.forward(input).into_data().to_vec().unwrap()
    }

    #[test]
    fn test_export_covers_all_parameters() {
        let device = Default::default();
        let model = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let map = WeightMap::from_model(&model).unwrap();

        assert_eq!(map.len(), 12);
        assert!(map.get("conv1.conv.weight").is_some());
        assert!(map.get("fc2.bias").is_some());
    }

    #[test]
    fn test_roundtrip_restores_exact_outputs() {
        let device = Default::default();
        let source = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let map = WeightMap::from_model(&source).unwrap();

        let target = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let (restored, report) = target.apply_weight_map(&map, &device);

        assert!(report.is_complete());
        assert_eq!(report.restored.len(), 12);
        assert!(report.unexpected.is_empty());
        assert_eq!(forward_values(&source), forward_values(&restored));
    }

    #[test]
    fn test_partial_map_reports_missing() {
        let device = Default::default();
        let source = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let full = WeightMap::from_model(&source).unwrap();

        let mut partial = WeightMap::default();
        for name in ["fc2.weight", "fc2.bias"] {
            partial.insert(name.to_string(), full.get(name).unwrap().clone());
        }

        let target = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let (restored, report) = target.apply_weight_map(&partial, &device);

        assert!(!report.is_complete());
        assert_eq!(report.restored.len(), 2);
        assert_eq!(report.missing.len(), 10);
        assert!(report.unexpected.is_empty());
        // Model stays usable with the remaining initial weights
        assert_eq!(forward_values(&restored).len(), 6);
    }

    #[test]
    fn test_shape_mismatch_is_skipped() {
        let device = Default::default();
        let wide = LeafClassifier::<TestBackend>::new(
            &small_config().with_hidden_size(16),
            &device,
        );
        let map = WeightMap::from_model(&wide).unwrap();

        let target = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let (restored, report) = target.apply_weight_map(&map, &device);

        assert!(!report.is_complete());
        assert!(report.mismatched.contains(&"fc1.weight".to_string()));
        assert!(report.mismatched.contains(&"fc2.weight".to_string()));
        assert_eq!(forward_values(&restored).len(), 6);
    }

    #[test]
    fn test_unexpected_entries_are_reported() {
        let device = Default::default();
        let source = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let mut map = WeightMap::from_model(&source).unwrap();
        map.insert(
            "head.weight".to_string(),
            TensorEntry {
                shape: vec![2, 2],
                data: vec![0.0; 4],
            },
        );

        let target = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let (_, report) = target.apply_weight_map(&map, &device);

        assert_eq!(report.unexpected, vec!["head.weight".to_string()]);
        assert!(report.is_complete());
    }

    #[test]
    fn test_file_roundtrip() {
        let device = Default::default();
        let model = LeafClassifier::<TestBackend>::new(&small_config(), &device);
        let map = WeightMap::from_model(&model).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        map.to_file(&path).unwrap();

        let reloaded = WeightMap::from_file(&path).unwrap();
        assert_eq!(reloaded.len(), map.len());
        assert_eq!(
            reloaded.get("conv1.conv.weight"),
            map.get("conv1.conv.weight")
        );
    }
}
