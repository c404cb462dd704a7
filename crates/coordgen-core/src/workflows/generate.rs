use crate::core::models::complex::{Complex, ComplexError};
use crate::core::models::ligand::{CatalogError, LigandCatalog};
use crate::core::models::sample::Dataset;
use crate::engine::config::GenerationConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::utils::sampling;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Why a single attempt did not yield a new sample.
#[derive(Debug)]
enum AttemptFailure {
    /// The complex was complete but its identity was already generated.
    DuplicateIdentity,
    /// No catalog ligand fits the remaining sites.
    DeadEnd { remaining: usize },
    /// `max_draws_per_complex` oversize draws were rejected while filling
    /// this complex.
    TooManyRejections,
}

/// Fills one complex with random ligands.
///
/// Oversize draws are rejected and redrawn; the complex is abandoned once no
/// ligand can fit or the rejection cap is reached.
fn fill_complex(
    catalog: &LigandCatalog,
    config: &GenerationConfig,
    min_denticity: usize,
    rng: &mut impl Rng,
) -> Result<Result<Complex, AttemptFailure>, EngineError> {
    let cn = sampling::draw_coordination_number(config.min_cn, config.max_cn, rng)?;
    let mut complex = Complex::new(&config.central_atom, config.oxidation_state, config.spin, cn)?;
    let mut rejections = 0;

    while !complex.is_complete() {
        let remaining = complex.remaining_sites();
        if min_denticity > remaining {
            return Ok(Err(AttemptFailure::DeadEnd { remaining }));
        }
        let (key, spec) = sampling::draw_ligand(catalog, rng)?;
        match complex.add_ligand(spec, key) {
            Ok(()) => {}
            Err(ComplexError::CapacityExceeded { .. }) => {
                rejections += 1;
                if rejections >= config.max_draws_per_complex {
                    return Ok(Err(AttemptFailure::TooManyRejections));
                }
            }
            Err(other) => return Err(other.into()),
        }
    }
    Ok(Ok(complex))
}

/// Generates `config.sample_count` distinct complexes.
///
/// Uniqueness holds within one call only. The run stops with
/// [`EngineError::GenerationExhausted`] after `config.max_attempts`
/// consecutive attempts that produced nothing new, whether the complex was a
/// duplicate, hit a dead end or exceeded `max_draws_per_complex`.
#[instrument(skip_all, name = "generation_workflow", fields(metal = %config.central_atom))]
pub fn run(
    catalog: &LigandCatalog,
    config: &GenerationConfig,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<Dataset, EngineError> {
    let min_denticity = catalog
        .min_denticity()
        .ok_or(EngineError::Catalog(CatalogError::Empty))?;

    reporter.report(Progress::PhaseStart {
        name: "Generating Complexes",
    });
    reporter.report(Progress::TaskStart {
        total_steps: config.sample_count as u64,
    });
    info!(
        samples = config.sample_count,
        min_cn = config.min_cn,
        max_cn = config.max_cn,
        "Starting complex generation."
    );

    let mut dataset = Dataset::new();
    let mut seen = HashSet::new();
    let mut failed_attempts = 0;

    while dataset.len() < config.sample_count {
        let outcome = match fill_complex(catalog, config, min_denticity, rng)? {
            Ok(complex) => {
                let sample = complex.to_sample()?;
                if seen.insert(sample.uid.clone()) {
                    Ok(sample)
                } else {
                    Err(AttemptFailure::DuplicateIdentity)
                }
            }
            Err(failure) => Err(failure),
        };

        match outcome {
            Ok(sample) => {
                debug!(uid = %sample.uid, cn = sample.core.coordination_number, "Accepted complex.");
                dataset.add_sample(sample);
                failed_attempts = 0;
                reporter.report(Progress::TaskIncrement);
            }
            Err(failure) => {
                failed_attempts += 1;
                match failure {
                    AttemptFailure::DuplicateIdentity => {
                        debug!(failed_attempts, "Discarded duplicate complex.")
                    }
                    AttemptFailure::DeadEnd { remaining } => debug!(
                        remaining,
                        failed_attempts,
                        "Abandoned complex: no ligand fits the remaining sites."
                    ),
                    AttemptFailure::TooManyRejections => debug!(
                        failed_attempts,
                        "Abandoned complex after too many rejected ligand draws."
                    ),
                }
                if failed_attempts >= config.max_attempts {
                    warn!(
                        generated = dataset.len(),
                        requested = config.sample_count,
                        "Giving up: the catalog cannot produce enough unique complexes."
                    );
                    reporter.report(Progress::Message(format!(
                        "Gave up after {} of {} complexes.",
                        dataset.len(),
                        config.sample_count
                    )));
                    return Err(EngineError::GenerationExhausted {
                        requested: config.sample_count,
                        generated: dataset.len(),
                        attempts: failed_attempts,
                    });
                }
            }
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    info!(samples = dataset.len(), "Generation complete.");
    Ok(dataset)
}

/// Runs [`run`] once per config and concatenates the results.
///
/// Samples are not deduplicated across configs.
pub fn run_many(
    catalog: &LigandCatalog,
    configs: &[GenerationConfig],
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> Result<Dataset, EngineError> {
    let mut dataset = Dataset::new();
    for config in configs {
        dataset.extend(run(catalog, config, rng, reporter)?);
    }
    Ok(dataset)
}
