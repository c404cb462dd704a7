//! # Workflows Module
//!
//! Top-level entry points. Each workflow validates its inputs, reports
//! progress and returns a result the caller can persist or inspect.
//!
//! - **Generation** ([`generate`]) - Random sampling of unique complexes from a ligand catalog
//! - **Optimisation** ([`optimise`]) - Fault-isolated batch calls to the structure builder,
//!   sequential or on a dedicated thread pool
//! - **Mutation** ([`mutate`]) - Central-atom substitution across optimised compounds

pub mod generate;
pub mod mutate;
pub mod optimise;
