use crate::core::io::artifacts::{
    self, ArtifactError, CHARGE_FILE, ERROR_FILE, GEOMETRY_FILE, UNPAIRED_ELECTRONS_FILE,
};
use crate::core::io::xyz::{XyzError, XyzMolecule};
use crate::core::models::sample::Sample;
use crate::engine::collaborator::{BuildError, StructureBuilder};
use serde_json::{Map, Value, json};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Everything one sample needs, owned, so that a job can move to any worker.
#[derive(Debug, Clone)]
pub struct SampleJob {
    pub sample: Sample,
    pub settings: Map<String, Value>,
    pub output_root: PathBuf,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Error)]
pub enum SampleFailure {
    #[error("Builder output is not a dict.")]
    InvalidResponseShape,
    #[error("Empty dictionary was produced.")]
    EmptyResult,
    #[error("Builder result is malformed: {0}")]
    MalformedResult(String),
    #[error("Builder call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Builder panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Geometry error: {0}")]
    Xyz(#[from] XyzError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug)]
pub struct SampleOutcome {
    pub uid: String,
    pub error: Option<String>,
}

impl SampleOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// The fields extracted from the first entry of a builder response.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStructure {
    pub geometry: XyzMolecule,
    pub total_charge: i64,
    pub unpaired_electrons: i64,
}

/// Request sent to the builder: the sample description, with the builder
/// settings merged over the sample's own parameters.
pub fn build_request(sample: &Sample, settings: &Map<String, Value>) -> Value {
    let mut parameters = Map::new();
    parameters.insert("metal_ox".to_string(), json!(sample.parameters.metal_ox));
    parameters.insert("full_spin".to_string(), json!(sample.parameters.full_spin));
    for (key, value) in settings {
        parameters.insert(key.clone(), value.clone());
    }
    json!({
        "core": sample.core,
        "ligands": sample.ligands,
        "parameters": parameters,
    })
}

pub fn parse_response(response: &Value) -> Result<BuiltStructure, SampleFailure> {
    let results = response
        .as_object()
        .ok_or(SampleFailure::InvalidResponseShape)?;
    let (_, first) = results.iter().next().ok_or(SampleFailure::EmptyResult)?;

    let geometry = if let Some(xyz) = first.get("xyz").and_then(Value::as_str) {
        XyzMolecule::parse(xyz)?
    } else if let Some(mol2) = first.get("mol2string").and_then(Value::as_str) {
        XyzMolecule::from_mol2(mol2)?
    } else {
        return Err(SampleFailure::MalformedResult(
            "no 'xyz' or 'mol2string' geometry".to_string(),
        ));
    };

    let integer = |key: &str| {
        first.get(key).and_then(Value::as_i64).ok_or_else(|| {
            SampleFailure::MalformedResult(format!("'{}' is missing or not an integer", key))
        })
    };

    Ok(BuiltStructure {
        geometry,
        total_charge: integer("total_charge")?,
        unpaired_electrons: integer("calc_n_unpaired_electrons")?,
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn call_builder(
    builder: &Arc<dyn StructureBuilder>,
    request: Value,
    timeout: Option<Duration>,
) -> Result<Value, SampleFailure> {
    let Some(limit) = timeout else {
        return panic::catch_unwind(AssertUnwindSafe(|| builder.build(&request)))
            .map_err(|p| SampleFailure::Panicked(panic_message(p)))?
            .map_err(SampleFailure::from);
    };

    // The call runs detached: a builder that never returns costs one parked
    // thread, not a stuck worker.
    let (tx, rx) = mpsc::channel();
    let builder = Arc::clone(builder);
    thread::Builder::new()
        .name("coordgen-builder".to_string())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| builder.build(&request)));
            let _ = tx.send(result);
        })
        .map_err(|e| SampleFailure::Io {
            path: "<builder thread>".to_string(),
            source: e,
        })?;

    match rx.recv_timeout(limit) {
        Ok(Ok(result)) => result.map_err(SampleFailure::from),
        Ok(Err(payload)) => Err(SampleFailure::Panicked(panic_message(payload))),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(SampleFailure::Timeout(limit)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(SampleFailure::Panicked(
            "builder thread exited without a result".to_string(),
        )),
    }
}

fn write_structure(structure: &BuiltStructure, dir: &Path) -> Result<(), SampleFailure> {
    structure.geometry.write_to_path(&dir.join(GEOMETRY_FILE))?;
    artifacts::write_integer(&dir.join(CHARGE_FILE), structure.total_charge)?;
    artifacts::write_integer(&dir.join(UNPAIRED_ELECTRONS_FILE), structure.unpaired_electrons)?;

    let stale_error = dir.join(ERROR_FILE);
    if stale_error.exists() {
        std::fs::remove_file(&stale_error).map_err(|e| SampleFailure::Io {
            path: stale_error.to_string_lossy().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

fn optimise(job: &SampleJob, dir: &Path, builder: &Arc<dyn StructureBuilder>) -> Result<(), SampleFailure> {
    let request = build_request(&job.sample, &job.settings);
    debug!(uid = %job.sample.uid, "Calling structure builder.");
    let response = call_builder(builder, request, job.timeout)?;
    let structure = parse_response(&response)?;
    write_structure(&structure, dir)?;
    debug!(uid = %job.sample.uid, dir = ?dir, "Saved optimised structure.");
    Ok(())
}

/// Optimises one sample into `output_root/uid`.
///
/// Never fails: any error ends up in the sample's `.err` artifact and in the
/// returned outcome.
pub fn run(job: SampleJob, builder: &Arc<dyn StructureBuilder>) -> SampleOutcome {
    let uid = job.sample.uid.clone();
    let dir = job.output_root.join(&uid);

    let result = std::fs::create_dir_all(&dir)
        .map_err(|e| SampleFailure::Io {
            path: dir.to_string_lossy().to_string(),
            source: e,
        })
        .and_then(|_| optimise(&job, &dir, builder));

    match result {
        Ok(()) => SampleOutcome { uid, error: None },
        Err(failure) => {
            let message = format!("Error processing data: {}", failure);
            warn!(uid = %uid, "{}", message);
            if let Err(e) = artifacts::write_error(&dir.join(ERROR_FILE), &message) {
                warn!(uid = %uid, error = %e, "Could not write error artifact.");
            }
            SampleOutcome {
                uid,
                error: Some(message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ligand::LigandSpec;
    use crate::core::models::sample::{Core, Parameters};
    use tempfile::tempdir;

    fn sample(uid: &str) -> Sample {
        Sample {
            uid: uid.to_string(),
            core: Core {
                metal: "La".to_string(),
                coordination_number: 1,
            },
            ligands: vec![LigandSpec::new("O", vec![0], "mono")],
            parameters: Parameters {
                metal_ox: 3,
                full_spin: 1,
            },
        }
    }

    fn good_response() -> Value {
        json!({
            "La_1_conformer": {
                "xyz": "2\nLa complex\nLa 0.0 0.0 0.0\nO 2.5 0.0 0.0\n",
                "total_charge": 3,
                "calc_n_unpaired_electrons": 0
            },
            "La_2_conformer": {"total_charge": 99}
        })
    }

    fn job(root: &Path, settings: Map<String, Value>, timeout: Option<Duration>) -> SampleJob {
        SampleJob {
            sample: sample("s1"),
            settings,
            output_root: root.to_path_buf(),
            timeout,
        }
    }

    #[test]
    fn request_merges_settings_over_sample_parameters() {
        let mut settings = Map::new();
        settings.insert("full_method".to_string(), json!("UFF"));
        settings.insert("full_spin".to_string(), json!(3));

        let request = build_request(&sample("s1"), &settings);

        assert_eq!(request["core"]["metal"], "La");
        assert_eq!(request["ligands"][0]["smiles"], "O");
        assert_eq!(request["parameters"]["metal_ox"], 3);
        assert_eq!(request["parameters"]["full_spin"], 3);
        assert_eq!(request["parameters"]["full_method"], "UFF");
    }

    #[test]
    fn response_must_be_a_non_empty_object() {
        assert!(matches!(
            parse_response(&json!([1, 2])),
            Err(SampleFailure::InvalidResponseShape)
        ));
        assert!(matches!(
            parse_response(&json!({})),
            Err(SampleFailure::EmptyResult)
        ));
    }

    #[test]
    fn response_uses_the_first_result_only() {
        let structure = parse_response(&good_response()).unwrap();
        assert_eq!(structure.total_charge, 3);
        assert_eq!(structure.unpaired_electrons, 0);
        assert_eq!(structure.geometry.atoms.len(), 2);
    }

    #[test]
    fn response_without_integers_is_malformed() {
        let response = json!({"r": {"xyz": "1\n\nLa 0 0 0\n", "total_charge": "3"}});
        assert!(matches!(
            parse_response(&response),
            Err(SampleFailure::MalformedResult(_))
        ));
    }

    #[test]
    fn successful_run_writes_three_artifacts() {
        let dir = tempdir().unwrap();
        let builder: Arc<dyn StructureBuilder> =
            Arc::new(|_: &Value| -> Result<Value, BuildError> { Ok(good_response()) });

        let outcome = run(job(dir.path(), Map::new(), None), &builder);

        assert!(outcome.is_success());
        let out = dir.path().join("s1");
        assert!(out.join(GEOMETRY_FILE).exists());
        assert_eq!(artifacts::read_integer(&out.join(CHARGE_FILE)).unwrap(), 3);
        assert_eq!(
            artifacts::read_integer(&out.join(UNPAIRED_ELECTRONS_FILE)).unwrap(),
            0
        );
        assert!(!out.join(ERROR_FILE).exists());
    }

    #[test]
    fn failing_builder_leaves_only_an_error_artifact() {
        let dir = tempdir().unwrap();
        let builder: Arc<dyn StructureBuilder> =
            Arc::new(|_: &Value| -> Result<Value, BuildError> {
                Err(BuildError::Failed("invalid chemistry".to_string()))
            });

        let outcome = run(job(dir.path(), Map::new(), None), &builder);

        assert!(!outcome.is_success());
        let out = dir.path().join("s1");
        let entries: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let message = std::fs::read_to_string(out.join(ERROR_FILE)).unwrap();
        assert!(message.starts_with("Error processing data: invalid chemistry"));
    }

    #[test]
    fn panicking_builder_is_contained() {
        let dir = tempdir().unwrap();
        let builder: Arc<dyn StructureBuilder> =
            Arc::new(|_: &Value| -> Result<Value, BuildError> { panic!("segfault-ish") });

        let outcome = run(job(dir.path(), Map::new(), None), &builder);

        assert!(outcome.error.unwrap().contains("segfault-ish"));
    }

    #[test]
    fn slow_builder_times_out() {
        let dir = tempdir().unwrap();
        let builder: Arc<dyn StructureBuilder> =
            Arc::new(|_: &Value| -> Result<Value, BuildError> {
                thread::sleep(Duration::from_secs(2));
                Ok(good_response())
            });

        let outcome = run(
            job(dir.path(), Map::new(), Some(Duration::from_millis(50))),
            &builder,
        );

        assert!(outcome.error.unwrap().contains("timed out"));
        assert!(dir.path().join("s1").join(ERROR_FILE).exists());
    }

    #[test]
    fn rerun_after_success_clears_stale_error() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("s1");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join(ERROR_FILE), "old failure").unwrap();
        let builder: Arc<dyn StructureBuilder> =
            Arc::new(|_: &Value| -> Result<Value, BuildError> { Ok(good_response()) });

        assert!(run(job(dir.path(), Map::new(), None), &builder).is_success());
        assert!(!out.join(ERROR_FILE).exists());
    }
}
