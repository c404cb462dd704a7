use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;
pub const DEFAULT_MAX_DRAWS_PER_COMPLEX: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

/// Parameters of one generation call: a single central-atom species in a
/// fixed oxidation and spin state, with coordination numbers drawn from
/// `min_cn..=max_cn`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub central_atom: String,
    pub oxidation_state: i32,
    pub spin: i32,
    pub sample_count: usize,
    pub min_cn: u32,
    pub max_cn: u32,
    /// Consecutive attempts without a new sample tolerated before giving up.
    /// Duplicates, dead ends and complexes that hit `max_draws_per_complex`
    /// all count.
    pub max_attempts: usize,
    /// Rejected ligand draws tolerated in total while filling one complex.
    pub max_draws_per_complex: usize,
}

#[derive(Default)]
pub struct GenerationConfigBuilder {
    central_atom: Option<String>,
    oxidation_state: Option<i32>,
    spin: Option<i32>,
    sample_count: Option<usize>,
    min_cn: Option<u32>,
    max_cn: Option<u32>,
    max_attempts: Option<usize>,
    max_draws_per_complex: Option<usize>,
}

impl GenerationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn central_atom(mut self, symbol: &str) -> Self {
        self.central_atom = Some(symbol.to_string());
        self
    }
    pub fn oxidation_state(mut self, state: i32) -> Self {
        self.oxidation_state = Some(state);
        self
    }
    pub fn spin(mut self, spin: i32) -> Self {
        self.spin = Some(spin);
        self
    }
    pub fn sample_count(mut self, n: usize) -> Self {
        self.sample_count = Some(n);
        self
    }
    pub fn coordination_range(mut self, min_cn: u32, max_cn: u32) -> Self {
        self.min_cn = Some(min_cn);
        self.max_cn = Some(max_cn);
        self
    }
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
    pub fn max_draws_per_complex(mut self, draws: usize) -> Self {
        self.max_draws_per_complex = Some(draws);
        self
    }

    pub fn build(self) -> Result<GenerationConfig, ConfigError> {
        let central_atom = self
            .central_atom
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingParameter("central_atom"))?;
        let sample_count = self
            .sample_count
            .ok_or(ConfigError::MissingParameter("sample_count"))?;
        let min_cn = self.min_cn.ok_or(ConfigError::MissingParameter("min_cn"))?;
        let max_cn = self.max_cn.ok_or(ConfigError::MissingParameter("max_cn"))?;

        if sample_count == 0 {
            return Err(ConfigError::Invalid {
                parameter: "sample_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if min_cn == 0 {
            return Err(ConfigError::Invalid {
                parameter: "min_cn",
                reason: "must be at least 1".to_string(),
            });
        }
        if max_cn < min_cn {
            return Err(ConfigError::Invalid {
                parameter: "max_cn",
                reason: format!("{} is smaller than min_cn {}", max_cn, min_cn),
            });
        }

        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        let max_draws_per_complex = self
            .max_draws_per_complex
            .unwrap_or(DEFAULT_MAX_DRAWS_PER_COMPLEX);
        if max_attempts == 0 || max_draws_per_complex == 0 {
            return Err(ConfigError::Invalid {
                parameter: "max_attempts",
                reason: "retry caps must be at least 1".to_string(),
            });
        }

        Ok(GenerationConfig {
            central_atom,
            oxidation_state: self
                .oxidation_state
                .ok_or(ConfigError::MissingParameter("oxidation_state"))?,
            spin: self.spin.ok_or(ConfigError::MissingParameter("spin"))?,
            sample_count,
            min_cn,
            max_cn,
            max_attempts,
            max_draws_per_complex,
        })
    }
}

/// Settings of an optimisation batch.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimiserConfig {
    pub output_root: PathBuf,
    /// Collaborator-specific settings, merged over each sample's parameters.
    pub settings: Map<String, Value>,
    pub workers: usize,
    /// Upper bound for a single collaborator call; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Default)]
pub struct OptimiserConfigBuilder {
    output_root: Option<PathBuf>,
    settings: Option<Map<String, Value>>,
    workers: Option<usize>,
    timeout: Option<Duration>,
}

impl OptimiserConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_root(mut self, path: PathBuf) -> Self {
        self.output_root = Some(path);
        self
    }
    pub fn settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = Some(settings);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OptimiserConfig, ConfigError> {
        let workers = self.workers.unwrap_or(1);
        if workers == 0 {
            return Err(ConfigError::Invalid {
                parameter: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Invalid {
                parameter: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(OptimiserConfig {
            output_root: self
                .output_root
                .ok_or(ConfigError::MissingParameter("output_root"))?,
            settings: self.settings.unwrap_or_default(),
            workers,
            timeout: self.timeout,
        })
    }
}

/// Settings of a mutation batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub oxidation_state: i32,
    pub new_oxidation_state: i32,
}
