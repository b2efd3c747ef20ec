//! Taxonomy table for class index to label resolution
//!
//! The classifier's output index maps to a compound label of the form
//! "Plant___Disease". The table is loaded from a JSON artifact (a flat map
//! from decimal-string index to compound label), validated once at load
//! time, and is immutable afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::utils::error::{LeafsightError, Result};

/// Separator between the plant and disease components of a compound label
pub const LABEL_SEPARATOR: &str = "___";

/// A resolved (leaf, disease) label pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabel {
    /// Leaf (plant) type, e.g. "Tomato"
    pub leaf: String,
    /// Disease name, e.g. "Leaf_Mold" or "healthy"
    pub disease: String,
}

impl ClassLabel {
    /// Parse a compound label of the form "Leaf___Disease".
    ///
    /// Splits on the first occurrence of the separator and trims both sides.
    /// A label without the separator becomes the disease, with the leaf set
    /// to "Unknown".
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(LABEL_SEPARATOR) {
            Some((leaf, disease)) => Self {
                leaf: leaf.trim().to_string(),
                disease: disease.trim().to_string(),
            },
            None => Self {
                leaf: "Unknown".to_string(),
                disease: raw.trim().to_string(),
            },
        }
    }

    /// Placeholder label for a class index absent from the taxonomy
    pub fn placeholder(index: usize) -> Self {
        Self {
            leaf: "Unknown".to_string(),
            disease: format!("Unknown{}Class_{}", LABEL_SEPARATOR, index),
        }
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.leaf, self.disease)
    }
}

/// Validated, immutable mapping from class index to `ClassLabel`
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTable {
    labels: BTreeMap<usize, ClassLabel>,
}

impl TaxonomyTable {
    /// Load and validate a taxonomy from a JSON file.
    ///
    /// The artifact must be a flat JSON object whose keys are non-negative
    /// integer strings; anything else is rejected with a typed error.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Load and validate a taxonomy from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;

        let mut labels = BTreeMap::new();
        for (key, value) in raw {
            let index: usize = key.parse().map_err(|_| {
                LeafsightError::Taxonomy(format!("non-numeric class index '{}'", key))
            })?;

            if labels.insert(index, ClassLabel::parse(&value)).is_some() {
                return Err(LeafsightError::Taxonomy(format!(
                    "duplicate class index {}",
                    index
                )));
            }
        }

        Ok(Self { labels })
    }

    /// Look up the label for a class index
    pub fn label(&self, index: usize) -> Option<&ClassLabel> {
        self.labels.get(&index)
    }

    /// Resolve a class index to a label, fabricating a placeholder when the
    /// index is absent. Never fails.
    pub fn resolve(&self, index: usize) -> ClassLabel {
        match self.labels.get(&index) {
            Some(label) => label.clone(),
            None => {
                warn!("Unknown class index: {}", index);
                ClassLabel::placeholder(index)
            }
        }
    }

    /// Number of entries in the table
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
