use crate::core::elements::{CentralAtomTable, MAX_OXIDATION_STATE};
use crate::engine::config::{ConfigError, MutationConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::mutate_compound::{self, MutationError};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

#[derive(Debug, Default)]
pub struct MutationReport {
    pub created: Vec<PathBuf>,
    /// Compound directories that could not be mutated, with the reason.
    pub failures: Vec<(PathBuf, MutationError)>,
}

/// Swaps the central atom of every compound under `input_dir` for each
/// other member of its lanthanide or actinide series.
pub struct Mutator {
    config: MutationConfig,
    table: CentralAtomTable,
}

impl Mutator {
    pub fn new(config: MutationConfig, table: CentralAtomTable) -> Result<Self, EngineError> {
        if config.new_oxidation_state > MAX_OXIDATION_STATE {
            return Err(ConfigError::Invalid {
                parameter: "new_oxidation_state",
                reason: format!(
                    "{} exceeds the supported maximum of {}",
                    config.new_oxidation_state, MAX_OXIDATION_STATE
                ),
            }
            .into());
        }
        std::fs::create_dir_all(&config.output_dir).map_err(|e| EngineError::Io {
            path: config.output_dir.to_string_lossy().to_string(),
            source: e,
        })?;
        Ok(Self { config, table })
    }

    fn compound_dirs(&self) -> Result<Vec<PathBuf>, EngineError> {
        let io_err = |e| EngineError::Io {
            path: self.config.input_dir.to_string_lossy().to_string(),
            source: e,
        };
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.config.input_dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Mutates every compound directory.
    ///
    /// The listing is taken before anything is written, so `output_dir` may
    /// equal `input_dir`.
    #[instrument(skip_all, name = "mutation_workflow")]
    pub fn run(&self, reporter: &ProgressReporter) -> Result<MutationReport, EngineError> {
        let dirs = self.compound_dirs()?;
        reporter.report(Progress::PhaseStart {
            name: "Mutating Compounds",
        });
        reporter.report(Progress::TaskStart {
            total_steps: dirs.len() as u64,
        });
        info!(
            compounds = dirs.len(),
            from = self.config.oxidation_state,
            to = self.config.new_oxidation_state,
            "Starting mutation batch."
        );

        let mut report = MutationReport::default();
        for dir in dirs {
            match mutate_compound::run(
                &dir,
                &self.config.output_dir,
                self.config.oxidation_state,
                self.config.new_oxidation_state,
                &self.table,
            ) {
                Ok(created) => report.created.extend(created),
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "Skipping compound.");
                    reporter.report(Progress::ItemFailed {
                        id: dir.to_string_lossy().to_string(),
                        reason: e.to_string(),
                    });
                    report.failures.push((dir, e));
                }
            }
            reporter.report(Progress::TaskIncrement);
        }

        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);
        info!(
            created = report.created.len(),
            failed = report.failures.len(),
            "Mutation batch complete."
        );
        Ok(report)
    }
}
