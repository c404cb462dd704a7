//! The external geometry-construction service, seen from the engine.
//!
//! The engine only needs one operation: turn a complex description plus
//! settings into a keyed result map. [`StructureBuilder`] is that seam;
//! [`ExternalCommand`] implements it by talking JSON to a child process,
//! which is how a Python geometry toolkit is usually bridged.

use serde_json::Value;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0}")]
    Failed(String),
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("I/O error while talking to the builder: {0}")]
    Io(#[from] std::io::Error),
    #[error("Builder exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },
    #[error("Builder output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Builder process killed after {0:?}")]
    Killed(Duration),
}

/// Builds and optimises a 3-D structure from a request map.
///
/// The request has the shape `{"core": .., "ligands": [..], "parameters": {..}}`.
/// A successful response is a JSON object whose first value holds the
/// geometry (`xyz` or `mol2string`), `total_charge` and
/// `calc_n_unpaired_electrons`.
pub trait StructureBuilder: Send + Sync {
    fn build(&self, request: &Value) -> Result<Value, BuildError>;
}

impl<F> StructureBuilder for F
where
    F: Fn(&Value) -> Result<Value, BuildError> + Send + Sync,
{
    fn build(&self, request: &Value) -> Result<Value, BuildError> {
        self(request)
    }
}

/// Runs an external program per request: JSON in on stdin, JSON out on stdout.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<String>,
    kill_after: Option<Duration>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            kill_after: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kills the child process once it has run for `limit`.
    pub fn kill_after(mut self, limit: Option<Duration>) -> Self {
        self.kill_after = limit;
        self
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = source {
            let _ = reader.read_to_end(&mut buf);
        }
        buf
    })
}

impl StructureBuilder for ExternalCommand {
    fn build(&self, request: &Value) -> Result<Value, BuildError> {
        let program = self.program.to_string_lossy().to_string();
        debug!(program = %program, "Spawning structure builder.");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(request)?;
            if let Err(e) = stdin.write_all(&payload) {
                warn!(error = %e, "Builder closed stdin before reading the whole request.");
            }
        }

        let status = match self.kill_after {
            None => child.wait()?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(BuildError::Killed(limit));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(BuildError::ExitStatus {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        Ok(serde_json::from_slice(&stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closures_act_as_builders() {
        let builder = |request: &Value| -> Result<Value, BuildError> {
            Ok(json!({"echo": request.clone()}))
        };
        let response = builder.build(&json!({"core": 1})).unwrap();
        assert_eq!(response["echo"]["core"], 1);
    }

    #[cfg(unix)]
    #[test]
    fn external_command_round_trips_json_through_stdio() {
        let command = ExternalCommand::new("cat");
        let request = json!({"core": {"metal": "La", "coreCN": 1}});
        assert_eq!(command.build(&request).unwrap(), request);
    }

    #[cfg(unix)]
    #[test]
    fn external_command_reports_non_zero_exit() {
        let command = ExternalCommand::new("sh").args(["-c", "echo bad chemistry >&2; exit 3"]);
        let err = command.build(&json!({})).unwrap_err();
        match err {
            BuildError::ExitStatus { stderr, .. } => assert_eq!(stderr, "bad chemistry"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn external_command_is_killed_after_limit() {
        let command = ExternalCommand::new("sleep")
            .args(["5"])
            .kill_after(Some(Duration::from_millis(100)));
        let started = Instant::now();
        let err = command.build(&json!({})).unwrap_err();
        assert!(matches!(err, BuildError::Killed(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let command = ExternalCommand::new("/definitely/not/a/builder");
        assert!(matches!(
            command.build(&json!({})),
            Err(BuildError::Spawn { .. })
        ));
    }
}
