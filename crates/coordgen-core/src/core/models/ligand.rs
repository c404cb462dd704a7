use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// A single ligand entry of the catalog.
///
/// The serialized field names follow the ligand files consumed by the
/// geometry-construction service (`smiles`, `coordList`, `ligType`), so the
/// same JSON can be fed to both sides without translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LigandSpec {
    /// Binding specification of the ligand (a SMILES string in practice).
    #[serde(rename = "smiles")]
    pub binding_spec: String,
    /// Indices of the coordinating atoms, one entry per occupied site.
    #[serde(rename = "coordList")]
    pub binding_pattern: Vec<i64>,
    /// Free-form category tag, e.g. `"mono"` or `"bi_cis"`.
    #[serde(rename = "ligType")]
    pub category: String,
}

impl LigandSpec {
    pub fn new(binding_spec: &str, binding_pattern: Vec<i64>, category: &str) -> Self {
        Self {
            binding_spec: binding_spec.to_string(),
            binding_pattern,
            category: category.to_string(),
        }
    }

    /// Number of coordination sites the ligand occupies.
    #[inline]
    pub fn denticity(&self) -> usize {
        self.binding_pattern.len()
    }
}

/// Immutable lookup table of ligands, keyed by their catalog identifier.
///
/// Entries are kept sorted by key so that random draws depend only on the
/// catalog content and the random source, never on hash-map iteration order.
#[derive(Debug, Clone, Default)]
pub struct LigandCatalog {
    entries: Vec<(String, LigandSpec)>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Ligand catalog is empty")]
    Empty,
    #[error("Ligand '{0}' has an empty binding pattern")]
    ZeroDenticity(String),
}

impl LigandCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let raw: BTreeMap<String, LigandSpec> =
            serde_json::from_str(&content).map_err(|e| CatalogError::Json {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        Self::from_entries(raw)
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, LigandSpec)>,
    ) -> Result<Self, CatalogError> {
        let sorted: BTreeMap<String, LigandSpec> = entries.into_iter().collect();
        if sorted.is_empty() {
            return Err(CatalogError::Empty);
        }
        if let Some((key, _)) = sorted.iter().find(|(_, spec)| spec.denticity() == 0) {
            return Err(CatalogError::ZeroDenticity(key.clone()));
        }
        Ok(Self {
            entries: sorted.into_iter().collect(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&LigandSpec> {
        self.entries
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Entry at a position of the sorted key order.
    pub fn entry(&self, index: usize) -> Option<(&str, &LigandSpec)> {
        self.entries
            .get(index)
            .map(|(key, spec)| (key.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn min_denticity(&self) -> Option<usize> {
        self.entries.iter().map(|(_, spec)| spec.denticity()).min()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LigandSpec)> {
        self.entries.iter().map(|(key, spec)| (key.as_str(), spec))
    }
}
