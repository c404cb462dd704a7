//! # Core Module
//!
//! Stateless building blocks of coordgen: the data models describing ligands,
//! complexes and datasets, the file formats they are stored in, and the
//! central-atom reference data used by the mutation utility.
//!
//! ## Architecture
//!
//! - **Models** ([`models`]) - Ligand catalog, the complex builder, samples and datasets
//! - **File I/O** ([`io`]) - Dataset JSON, XYZ geometries and per-sample artifacts
//! - **Reference Data** ([`elements`]) - Lanthanide/actinide series and spin multiplicities
//!
//! Nothing in this layer performs random draws or talks to external programs;
//! that is the job of [`crate::engine`].

pub mod elements;
pub mod io;
pub mod models;
