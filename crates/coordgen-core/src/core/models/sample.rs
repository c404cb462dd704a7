use super::ligand::LigandSpec;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Index};

/// Central-atom part of a complex description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Core {
    pub metal: String,
    #[serde(rename = "coreCN")]
    pub coordination_number: u32,
}

/// Electronic parameters attached to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameters {
    /// Oxidation state of the central atom.
    pub metal_ox: i32,
    /// Spin multiplicity (2S+1).
    pub full_spin: i32,
}

/// Structural description of a complex: the central atom plus its ordered ligand list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexDescription {
    pub core: Core,
    pub ligands: Vec<LigandSpec>,
}

/// Serialized form of a completed complex, identified by its identity hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub uid: String,
    pub core: Core,
    pub ligands: Vec<LigandSpec>,
    pub parameters: Parameters,
}

impl Sample {
    pub fn description(&self) -> ComplexDescription {
        ComplexDescription {
            core: self.core.clone(),
            ligands: self.ligands.clone(),
        }
    }

    pub fn total_denticity(&self) -> usize {
        self.ligands.iter().map(LigandSpec::denticity).sum()
    }
}

/// An ordered collection of samples.
///
/// Membership is decided by `uid`, but uniqueness is not enforced here:
/// concatenating two datasets keeps every sample of both, duplicates included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.samples.iter().any(|s| s.uid == uid)
    }

    /// Appends a sample as the last element.
    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Drops every sample whose uid is listed and returns how many were removed.
    pub fn remove<S: AsRef<str>>(&mut self, uids: &[S]) -> usize {
        let before = self.samples.len();
        self.samples
            .retain(|s| !uids.iter().any(|uid| uid.as_ref() == s.uid));
        before - self.samples.len()
    }

    pub fn extend(&mut self, other: Dataset) {
        self.samples.extend(other.samples);
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}

impl Add for Dataset {
    type Output = Dataset;

    fn add(mut self, rhs: Dataset) -> Dataset {
        self.extend(rhs);
        self
    }
}

impl Index<usize> for Dataset {
    type Output = Sample;

    fn index(&self, index: usize) -> &Sample {
        &self.samples[index]
    }
}

impl IntoIterator for Dataset {
    type Item = Sample;
    type IntoIter = std::vec::IntoIter<Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl FromIterator<Sample> for Dataset {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}
