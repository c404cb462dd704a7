use super::config::ConfigError;
use crate::core::elements::TableError;
use crate::core::io::dataset::DatasetError;
use crate::core::models::complex::ComplexError;
use crate::core::models::ligand::CatalogError;
use crate::engine::utils::sampling::SamplingError;
use thiserror::Error;

/// Fatal errors that terminate a whole workflow run.
///
/// Per-sample and per-compound failures never end up here; they are
/// recorded by the workflow that owns the batch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Ligand catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Central-atom table error: {0}")]
    Table(#[from] TableError),

    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Complex construction error: {0}")]
    Complex(#[from] ComplexError),

    #[error(
        "Generation exhausted after {attempts} attempts with {generated} of {requested} unique complexes"
    )]
    GenerationExhausted {
        requested: usize,
        generated: usize,
        attempts: usize,
    },

    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),
}
