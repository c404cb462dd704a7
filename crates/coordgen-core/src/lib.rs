//! # coordgen Core Library
//!
//! Generates datasets of lanthanide and actinide coordination complexes and
//! drives their 3-D optimisation through an external structure builder.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`LigandCatalog`, `Complex`,
//!   `Dataset`), file formats and central-atom reference data.
//!
//! - **[`engine`]: The Logic Core.** Validated configuration, random draws, the
//!   `StructureBuilder` seam and the per-item tasks (optimise one sample, mutate
//!   one compound).
//!
//! - **[`workflows`]: The Public API.** Generation, batch optimisation and
//!   mutation, each a single call with progress reporting.

pub mod core;
pub mod engine;
pub mod workflows;
