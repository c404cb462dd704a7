use crate::core::models::sample::{Dataset, Sample};
use crate::engine::collaborator::StructureBuilder;
use crate::engine::config::OptimiserConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::optimise_sample::{self, SampleJob, SampleOutcome};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of an optimisation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Uids whose sample directory holds an `.err` artifact.
    pub failed: Vec<String>,
}

impl BatchSummary {
    fn from_outcomes(outcomes: Vec<SampleOutcome>) -> Self {
        let total = outcomes.len();
        let failed: Vec<String> = outcomes
            .into_iter()
            .filter(|o| !o.is_success())
            .map(|o| o.uid)
            .collect();
        Self {
            total,
            succeeded: total - failed.len(),
            failed,
        }
    }
}

/// Runs the structure builder over every sample of a dataset and stores the
/// artifacts under one directory per uid.
pub struct Optimiser {
    config: OptimiserConfig,
    builder: Arc<dyn StructureBuilder>,
}

impl Optimiser {
    /// Creates the output root up front.
    pub fn new(
        config: OptimiserConfig,
        builder: Arc<dyn StructureBuilder>,
    ) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.output_root).map_err(|e| EngineError::Io {
            path: config.output_root.to_string_lossy().to_string(),
            source: e,
        })?;
        Ok(Self { config, builder })
    }

    pub fn config(&self) -> &OptimiserConfig {
        &self.config
    }

    fn job_for(&self, sample: &Sample) -> SampleJob {
        SampleJob {
            sample: sample.clone(),
            settings: self.config.settings.clone(),
            output_root: self.config.output_root.clone(),
            timeout: self.config.timeout,
        }
    }

    fn process(&self, job: SampleJob, reporter: &ProgressReporter) -> SampleOutcome {
        let outcome = optimise_sample::run(job, &self.builder);
        if let Some(reason) = &outcome.error {
            reporter.report(Progress::ItemFailed {
                id: outcome.uid.clone(),
                reason: reason.clone(),
            });
        }
        reporter.report(Progress::TaskIncrement);
        outcome
    }

    fn run_sequential(&self, dataset: &Dataset, reporter: &ProgressReporter) -> Vec<SampleOutcome> {
        dataset
            .iter()
            .map(|sample| self.process(self.job_for(sample), reporter))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(
        &self,
        dataset: &Dataset,
        reporter: &ProgressReporter,
    ) -> Result<Vec<SampleOutcome>, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("coordgen-worker-{}", i))
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;

        let jobs: Vec<SampleJob> = dataset.iter().map(|s| self.job_for(s)).collect();
        Ok(pool.install(|| {
            jobs.into_par_iter()
                .map(|job| self.process(job, reporter))
                .collect()
        }))
    }

    #[cfg(not(feature = "parallel"))]
    fn run_parallel(
        &self,
        dataset: &Dataset,
        reporter: &ProgressReporter,
    ) -> Result<Vec<SampleOutcome>, EngineError> {
        warn!(
            workers = self.config.workers,
            "Built without the `parallel` feature; processing samples sequentially."
        );
        Ok(self.run_sequential(dataset, reporter))
    }

    /// Optimises every sample of `dataset`.
    ///
    /// A failing sample never aborts the batch: its error is written to the
    /// sample's `.err` artifact and listed in the summary.
    #[instrument(skip_all, name = "optimisation_workflow", fields(workers = self.config.workers))]
    pub fn run(
        &self,
        dataset: &Dataset,
        reporter: &ProgressReporter,
    ) -> Result<BatchSummary, EngineError> {
        reporter.report(Progress::PhaseStart {
            name: "Optimising Samples",
        });
        reporter.report(Progress::TaskStart {
            total_steps: dataset.len() as u64,
        });
        info!(
            samples = dataset.len(),
            root = ?self.config.output_root,
            "Starting optimisation batch."
        );

        let outcomes = if self.config.workers <= 1 {
            self.run_sequential(dataset, reporter)
        } else {
            self.run_parallel(dataset, reporter)?
        };
        let summary = BatchSummary::from_outcomes(outcomes);

        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);
        if summary.failed.is_empty() {
            info!(total = summary.total, "Optimisation batch complete.");
        } else {
            warn!(
                total = summary.total,
                failed = summary.failed.len(),
                "Optimisation batch complete with failures."
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::artifacts::{CHARGE_FILE, ERROR_FILE, GEOMETRY_FILE};
    use crate::core::models::ligand::LigandSpec;
    use crate::core::models::sample::{Core, Parameters, Sample};
    use crate::engine::collaborator::BuildError;
    use crate::engine::config::OptimiserConfigBuilder;
    use serde_json::{Map, Value, json};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    fn sample(uid: &str, ligand: &str) -> Sample {
        Sample {
            uid: uid.to_string(),
            core: Core {
                metal: "Ce".to_string(),
                coordination_number: 1,
            },
            ligands: vec![LigandSpec::new(ligand, vec![0], "mono")],
            parameters: Parameters {
                metal_ox: 3,
                full_spin: 2,
            },
        }
    }

    fn dataset() -> Dataset {
        Dataset::from_samples(vec![
            sample("u1", "O"),
            sample("u2", "BROKEN"),
            sample("u3", "N"),
            sample("u4", "Cl"),
        ])
    }

    /// Fails for the ligand `BROKEN`, otherwise echoes the charge back.
    fn fake_builder(request: &Value) -> Result<Value, BuildError> {
        if request["ligands"][0]["smiles"] == "BROKEN" {
            return Err(BuildError::Failed("cannot embed ligand".to_string()));
        }
        Ok(json!({
            "conformer_0": {
                "xyz": "2\n\nCe 0 0 0\nO 0 0 2.4\n",
                "total_charge": request["parameters"]["metal_ox"],
                "calc_n_unpaired_electrons": 1
            }
        }))
    }

    fn optimiser(root: &Path, workers: usize) -> Optimiser {
        let config = OptimiserConfigBuilder::new()
            .output_root(root.to_path_buf())
            .workers(workers)
            .build()
            .unwrap();
        Optimiser::new(config, Arc::new(fake_builder)).unwrap()
    }

    fn assert_fault_isolated(root: &Path, summary: &BatchSummary) {
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, vec!["u2".to_string()]);
        for uid in ["u1", "u3", "u4"] {
            assert!(root.join(uid).join(GEOMETRY_FILE).exists());
            assert!(root.join(uid).join(CHARGE_FILE).exists());
            assert!(!root.join(uid).join(ERROR_FILE).exists());
        }
        assert!(root.join("u2").join(ERROR_FILE).exists());
        assert!(!root.join("u2").join(GEOMETRY_FILE).exists());
    }

    #[test]
    fn new_creates_the_output_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("out");
        optimiser(&root, 1);
        assert!(root.is_dir());
    }

    #[test]
    fn sequential_batch_isolates_failing_sample() {
        let dir = tempdir().unwrap();
        let summary = optimiser(dir.path(), 1)
            .run(&dataset(), &ProgressReporter::new())
            .unwrap();
        assert_fault_isolated(dir.path(), &summary);
    }

    #[test]
    fn parallel_batch_isolates_failing_sample() {
        let dir = tempdir().unwrap();
        let summary = optimiser(dir.path(), 3)
            .run(&dataset(), &ProgressReporter::new())
            .unwrap();
        assert_fault_isolated(dir.path(), &summary);
    }

    #[test]
    fn settings_reach_the_builder_merged_with_parameters() {
        let dir = tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let seen = Arc::clone(&seen);
            move |request: &Value| -> Result<Value, BuildError> {
                seen.lock().unwrap().push(request["parameters"].clone());
                fake_builder(request)
            }
        };
        let mut settings = Map::new();
        settings.insert("full_method".to_string(), json!("GFN2-xTB"));
        let config = OptimiserConfigBuilder::new()
            .output_root(dir.path().to_path_buf())
            .settings(settings)
            .build()
            .unwrap();

        Optimiser::new(config, Arc::new(recorder))
            .unwrap()
            .run(&Dataset::from_samples(vec![sample("u1", "O")]), &ProgressReporter::new())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            json!({"metal_ox": 3, "full_spin": 2, "full_method": "GFN2-xTB"})
        );
    }

    #[test]
    fn timeouts_fail_only_the_slow_sample() {
        let dir = tempdir().unwrap();
        let slow_on_u2 = |request: &Value| -> Result<Value, BuildError> {
            if request["ligands"][0]["smiles"] == "BROKEN" {
                std::thread::sleep(Duration::from_secs(2));
            }
            Ok(json!({
                "c": {
                    "xyz": "1\n\nCe 0 0 0\n",
                    "total_charge": 3,
                    "calc_n_unpaired_electrons": 1
                }
            }))
        };
        let config = OptimiserConfigBuilder::new()
            .output_root(dir.path().to_path_buf())
            .workers(2)
            .timeout(Some(Duration::from_millis(200)))
            .build()
            .unwrap();

        let summary = Optimiser::new(config, Arc::new(slow_on_u2))
            .unwrap()
            .run(&dataset(), &ProgressReporter::new())
            .unwrap();

        assert_eq!(summary.failed, vec!["u2".to_string()]);
        let message = std::fs::read_to_string(dir.path().join("u2").join(ERROR_FILE)).unwrap();
        assert!(message.contains("timed out"));
    }

    #[test]
    fn progress_reports_every_sample_and_each_failure() {
        let dir = tempdir().unwrap();
        let increments = Mutex::new(0);
        let failures = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| match event {
            Progress::TaskIncrement => *increments.lock().unwrap() += 1,
            Progress::ItemFailed { id, .. } => failures.lock().unwrap().push(id),
            _ => {}
        }));

        optimiser(dir.path(), 2).run(&dataset(), &reporter).unwrap();
        drop(reporter);

        assert_eq!(increments.into_inner().unwrap(), 4);
        assert_eq!(failures.into_inner().unwrap(), vec!["u2".to_string()]);
    }
}
