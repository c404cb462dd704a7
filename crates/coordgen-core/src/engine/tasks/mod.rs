//! Units of work applied to a single item of a batch.
//!
//! A task handles one sample or one compound directory and reports its own
//! failure; deciding whether the batch continues is left to the workflow.

pub mod mutate_compound;
pub mod optimise_sample;
