//! Per-sample plain-text artifacts written next to the optimised geometry.

use std::path::Path;
use thiserror::Error;

/// Optimised geometry in XYZ format.
pub const GEOMETRY_FILE: &str = "sample.xyz";
/// Integer net charge of the complex.
pub const CHARGE_FILE: &str = ".CHRG";
/// Integer number of unpaired electrons.
pub const UNPAIRED_ELECTRONS_FILE: &str = ".UHF";
/// Error message of a failed sample.
pub const ERROR_FILE: &str = ".err";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Expected an integer in '{path}', found '{value}'")]
    InvalidInteger { path: String, value: String },
}

pub fn write_integer(path: &Path, value: i64) -> Result<(), ArtifactError> {
    std::fs::write(path, value.to_string()).map_err(|e| ArtifactError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Reads the integer stored on the first line of `path`.
pub fn read_integer(path: &Path) -> Result<i64, ArtifactError> {
    let content = std::fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let first = content.lines().next().unwrap_or("").trim();
    first.parse().map_err(|_| ArtifactError::InvalidInteger {
        path: path.to_string_lossy().to_string(),
        value: first.to_string(),
    })
}

pub fn write_error(path: &Path, message: &str) -> Result<(), ArtifactError> {
    std::fs::write(path, format!("{}\n", message)).map_err(|e| ArtifactError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}
