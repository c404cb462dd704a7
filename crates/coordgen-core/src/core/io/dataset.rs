//! JSON persistence for [`Dataset`].
//!
//! A dataset is stored as one JSON object mapping each sample `uid` to the
//! remaining sample fields:
//!
//! ```json
//! {
//!     "<uid>": {
//!         "core": {"metal": "La", "coreCN": 6},
//!         "ligands": [{"smiles": "O", "coordList": [0], "ligType": "mono"}],
//!         "parameters": {"metal_ox": 3, "full_spin": 1}
//!     }
//! }
//! ```
//!
//! Keys are written in sample insertion order and read back in file order.
//! That order is an implementation detail; callers should rely on `uid` only.
//!
//! A JSON object cannot repeat a key, so a dataset holding the same uid more
//! than once is collapsed on write: the last sample wins and takes the key
//! position of the first occurrence.

use crate::core::models::ligand::LigandSpec;
use crate::core::models::sample::{Core, Dataset, Parameters, Sample};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Serialize)]
struct SampleBodyRef<'a> {
    core: &'a Core,
    ligands: &'a [LigandSpec],
    parameters: &'a Parameters,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SampleBody {
    core: Core,
    ligands: Vec<LigandSpec>,
    parameters: Parameters,
}

/// One sample per uid, last occurrence winning, in first-seen key order.
fn unique_by_uid(dataset: &Dataset) -> Vec<&Sample> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(dataset.len());
    let mut unique: Vec<&Sample> = Vec::with_capacity(dataset.len());
    for sample in dataset {
        match positions.get(sample.uid.as_str()) {
            Some(&pos) => unique[pos] = sample,
            None => {
                positions.insert(&sample.uid, unique.len());
                unique.push(sample);
            }
        }
    }
    unique
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let unique = unique_by_uid(self);
        if unique.len() < self.len() {
            warn!(
                duplicates = self.len() - unique.len(),
                "Dataset repeats some uids; only the last sample of each is written."
            );
        }
        let mut map = serializer.serialize_map(Some(unique.len()))?;
        for sample in unique {
            map.serialize_entry(
                &sample.uid,
                &SampleBodyRef {
                    core: &sample.core,
                    ligands: &sample.ligands,
                    parameters: &sample.parameters,
                },
            )?;
        }
        map.end()
    }
}

struct DatasetVisitor;

impl<'de> Visitor<'de> for DatasetVisitor {
    type Value = Dataset;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map from sample uid to sample body")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Dataset, A::Error> {
        let mut samples = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((uid, body)) = access.next_entry::<String, SampleBody>()? {
            samples.push(Sample {
                uid,
                core: body.core,
                ligands: body.ligands,
                parameters: body.parameters,
            });
        }
        Ok(Dataset::from_samples(samples))
    }
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DatasetVisitor)
    }
}

pub fn to_json_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    dataset.serialize(&mut serializer)?;
    // serde_json only ever emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn from_json_str(content: &str) -> Result<Dataset, serde_json::Error> {
    serde_json::from_str(content)
}

pub fn write(dataset: &Dataset, path: &Path) -> Result<(), DatasetError> {
    let io_err = |e| DatasetError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    dataset
        .serialize(&mut serializer)
        .map_err(|e| DatasetError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
    writer.flush().map_err(io_err)
}

pub fn read(path: &Path) -> Result<Dataset, DatasetError> {
    let file = File::open(path).map_err(|e| DatasetError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| DatasetError::Json {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}
