use super::ligand::LigandSpec;
use super::sample::{ComplexDescription, Core, Parameters, Sample};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ComplexError {
    #[error(
        "Ligand denticity {denticity} exceeds the {remaining} remaining coordination site(s)"
    )]
    CapacityExceeded { denticity: usize, remaining: usize },
    #[error("The complex is already complete, no more ligands can be added")]
    AlreadyComplete,
    #[error("The complex still has {remaining} free coordination site(s)")]
    Incomplete { remaining: usize },
    #[error("Coordination number must be at least 1")]
    InvalidCoordinationNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedLigand {
    pub spec: LigandSpec,
    pub key: String,
}

/// A coordination complex under construction.
///
/// Sites are filled by [`Complex::add_ligand`] until none remain; at that
/// point the complex freezes and its identity hash is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complex {
    central_atom: String,
    oxidation_state: i32,
    spin: i32,
    coordination_number: u32,
    remaining_sites: usize,
    ligands: Vec<SelectedLigand>,
    identity_hash: Option<String>,
}

impl Complex {
    pub fn new(
        central_atom: &str,
        oxidation_state: i32,
        spin: i32,
        coordination_number: u32,
    ) -> Result<Self, ComplexError> {
        if coordination_number == 0 {
            return Err(ComplexError::InvalidCoordinationNumber);
        }
        Ok(Self {
            central_atom: central_atom.to_string(),
            oxidation_state,
            spin,
            coordination_number,
            remaining_sites: coordination_number as usize,
            ligands: Vec::new(),
            identity_hash: None,
        })
    }

    pub fn add_ligand(&mut self, spec: &LigandSpec, key: &str) -> Result<(), ComplexError> {
        if self.is_complete() {
            return Err(ComplexError::AlreadyComplete);
        }
        let denticity = spec.denticity();
        if denticity > self.remaining_sites {
            return Err(ComplexError::CapacityExceeded {
                denticity,
                remaining: self.remaining_sites,
            });
        }

        self.remaining_sites -= denticity;
        self.ligands.push(SelectedLigand {
            spec: spec.clone(),
            key: key.to_string(),
        });

        if self.remaining_sites == 0 {
            self.identity_hash = Some(self.compute_identity_hash());
        }
        Ok(())
    }

    fn compute_identity_hash(&self) -> String {
        let mut keys: Vec<&str> = self.ligands.iter().map(|l| l.key.as_str()).collect();
        keys.sort_unstable();
        let identity = format!(
            "{}_{}_{}_{}",
            self.central_atom,
            self.coordination_number,
            self.oxidation_state,
            keys.join("_")
        );

        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.identity_hash.is_some()
    }

    pub fn remaining_sites(&self) -> usize {
        self.remaining_sites
    }

    pub fn identity_hash(&self) -> Option<&str> {
        self.identity_hash.as_deref()
    }

    pub fn central_atom(&self) -> &str {
        &self.central_atom
    }

    pub fn oxidation_state(&self) -> i32 {
        self.oxidation_state
    }

    pub fn spin(&self) -> i32 {
        self.spin
    }

    pub fn coordination_number(&self) -> u32 {
        self.coordination_number
    }

    pub fn ligands(&self) -> &[SelectedLigand] {
        &self.ligands
    }

    pub fn to_description(&self) -> ComplexDescription {
        ComplexDescription {
            core: Core {
                metal: self.central_atom.clone(),
                coordination_number: self.coordination_number,
            },
            ligands: self.ligands.iter().map(|l| l.spec.clone()).collect(),
        }
    }

    pub fn to_sample(&self) -> Result<Sample, ComplexError> {
        let uid = self
            .identity_hash
            .clone()
            .ok_or(ComplexError::Incomplete {
                remaining: self.remaining_sites,
            })?;
        let ComplexDescription { core, ligands } = self.to_description();
        Ok(Sample {
            uid,
            core,
            ligands,
            parameters: Parameters {
                metal_ox: self.oxidation_state,
                full_spin: self.spin,
            },
        })
    }
}
