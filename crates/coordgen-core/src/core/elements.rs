//! Central-atom reference data used by the mutation utility.
//!
//! Nothing here is process-global: a [`CentralAtomTable`] is built explicitly
//! and handed to whichever component needs it.

use phf::{Set, phf_set};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use thiserror::Error;

static LANTHANIDES: Set<&'static str> = phf_set! {
    "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu",
};

static ACTINIDES: Set<&'static str> = phf_set! {
    "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr",
    "Fr", "Ra",
};

/// Highest oxidation state covered by the multiplicity tables.
pub const MAX_OXIDATION_STATE: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Lanthanide,
    Actinide,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Multiplicity table '{path}' has no 'element' column")]
    MissingElementColumn { path: String },
    #[error("Invalid multiplicity '{value}' for {element} at oxidation state {oxidation_state}")]
    InvalidMultiplicity {
        element: String,
        oxidation_state: i32,
        value: String,
    },
}

/// Series membership plus spin multiplicities per (element, oxidation state).
#[derive(Debug, Clone)]
pub struct CentralAtomTable {
    members: HashMap<Series, BTreeSet<String>>,
    multiplicities: HashMap<(String, i32), i32>,
}

impl CentralAtomTable {
    /// Standard lanthanide/actinide membership with an empty multiplicity table.
    pub fn standard() -> Self {
        let mut members = HashMap::new();
        members.insert(
            Series::Lanthanide,
            LANTHANIDES.iter().map(|s| s.to_string()).collect(),
        );
        members.insert(
            Series::Actinide,
            ACTINIDES.iter().map(|s| s.to_string()).collect(),
        );
        Self {
            members,
            multiplicities: HashMap::new(),
        }
    }

    pub fn with_multiplicity(mut self, element: &str, oxidation_state: i32, value: i32) -> Self {
        self.multiplicities
            .insert((element.to_ascii_lowercase(), oxidation_state), value);
        self
    }

    /// Loads multiplicities from a `;`-separated CSV file.
    ///
    /// The file needs an `element` column; every column whose header is an
    /// integer is read as the multiplicity at that oxidation state. Other
    /// columns (such as a leading index) and empty cells are ignored.
    pub fn load_multiplicities(mut self, path: &Path) -> Result<Self, TableError> {
        let path_str = path.to_string_lossy().to_string();
        let file = std::fs::File::open(path).map_err(|e| TableError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| TableError::Csv {
                path: path_str.clone(),
                source: e,
            })?
            .clone();
        let element_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("element"))
            .ok_or_else(|| TableError::MissingElementColumn {
                path: path_str.clone(),
            })?;
        let state_cols: Vec<(usize, i32)> = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| h.parse::<i32>().ok().map(|os| (idx, os)))
            .collect();

        for record in reader.records() {
            let record = record.map_err(|e| TableError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
            let Some(element) = record.get(element_col) else {
                continue;
            };
            for &(col, oxidation_state) in &state_cols {
                let Some(raw) = record.get(col).filter(|v| !v.is_empty()) else {
                    continue;
                };
                let value = raw
                    .parse::<i32>()
                    .or_else(|_| raw.parse::<f64>().map(|v| v as i32))
                    .map_err(|_| TableError::InvalidMultiplicity {
                        element: element.to_string(),
                        oxidation_state,
                        value: raw.to_string(),
                    })?;
                self.multiplicities
                    .insert((element.to_ascii_lowercase(), oxidation_state), value);
            }
        }
        Ok(self)
    }

    pub fn series_of(&self, element: &str) -> Option<Series> {
        self.members
            .iter()
            .find(|(_, set)| set.contains(element))
            .map(|(series, _)| *series)
    }

    pub fn is_central_atom(&self, element: &str) -> bool {
        self.series_of(element).is_some()
    }

    /// Members of `series` in alphabetical order.
    pub fn members(&self, series: Series) -> impl Iterator<Item = &str> {
        self.members
            .get(&series)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Spin multiplicity (2S+1), looked up case-insensitively by element.
    pub fn multiplicity(&self, element: &str, oxidation_state: i32) -> Option<i32> {
        self.multiplicities
            .get(&(element.to_ascii_lowercase(), oxidation_state))
            .copied()
    }
}
