//! # Engine Module
//!
//! The stateful machinery behind the workflows: configuration and its
//! validation, random draws, the seam to the external structure builder, and
//! the per-item tasks run by the batch workflows.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated settings built through builder types
//! - **Collaborator** ([`collaborator`]) - The [`collaborator::StructureBuilder`] trait and its subprocess adapter
//! - **Tasks** ([`tasks`]) - Optimisation of one sample, mutation of one compound
//! - **Progress Monitoring** ([`progress`]) - Progress events delivered to an optional callback
//! - **Error Handling** ([`error`]) - Errors that abort a whole workflow run

pub mod collaborator;
pub mod config;
pub mod error;
pub mod progress;
pub mod tasks;
pub mod utils;
