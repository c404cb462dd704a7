//! Utility functions for the engine module.
//!
//! Random draws used by the dataset sampler live here so that every source of
//! randomness goes through an injected generator.

pub mod sampling;
