//! # Core Models Module
//!
//! Data structures describing coordination complexes.
//!
//! ## Key Components
//!
//! - [`ligand`] - Ligand specifications and the keyed catalog they are drawn from
//! - [`complex`] - A complex under construction, frozen with an identity hash once complete
//! - [`sample`] - Completed complexes in their serialised form, and ordered datasets of them
//!
//! ## Usage
//!
//! ```ignore
//! use coordgen::core::models::{complex::Complex, ligand::LigandSpec};
//!
//! let water = LigandSpec::new("O", vec![0], "mono");
//! let mut complex = Complex::new("La", 3, 1, 2)?;
//! complex.add_ligand(&water, "aqua")?;
//! complex.add_ligand(&water, "aqua")?;
//!
//! let sample = complex.to_sample()?;
//! assert_eq!(sample.total_denticity(), 2);
//! ```

pub mod complex;
pub mod ligand;
pub mod sample;
