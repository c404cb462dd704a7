//! Reading and writing the files coordgen produces and consumes.
//!
//! Datasets are stored as a single JSON object keyed by sample uid; every
//! optimised sample gets its own directory holding an XYZ geometry plus small
//! plain-text artifacts.

pub mod artifacts;
pub mod dataset;
pub mod xyz;
