use crate::cli::{GenerateArgs, OptimiseArgs};
use crate::error::{CliError, Result};
use coordgen::engine::collaborator::ExternalCommand;
use coordgen::engine::config::{
    self as core_config, GenerationConfig, GenerationConfigBuilder, OptimiserConfig,
    OptimiserConfigBuilder,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading configuration from file: {:?}", path);
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn split_set_value(kv_pair: &str) -> Result<(&str, &str)> {
    kv_pair.split_once('=').ok_or_else(|| {
        CliError::Config(format!(
            "Invalid --set format: '{}'. Expected KEY=VALUE.",
            kv_pair
        ))
    })
}

fn parse_set_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn require<T>(batch_idx: usize, value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| {
        CliError::Config(format!(
            "Batch {}: a value for '{}' is required either in the config file or via CLI argument.",
            batch_idx + 1,
            key
        ))
    })
}

// --- Generation ---

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialBatchConfig {
    metal: Option<String>,
    oxidation_state: Option<i32>,
    spin: Option<i32>,
    samples: Option<usize>,
    min_cn: Option<u32>,
    max_cn: Option<u32>,
    max_attempts: Option<usize>,
    max_draws_per_complex: Option<usize>,
}

/// Generation config file: shared sampling settings plus one `[[batch]]`
/// table per central-atom species.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialGenerationConfig {
    seed: Option<u64>,
    max_attempts: Option<usize>,
    max_draws_per_complex: Option<usize>,
    #[serde(default)]
    batch: Vec<PartialBatchConfig>,
}

/// Values given with `-S`; they take precedence over every file level.
#[derive(Debug, Default)]
struct GenerationOverrides {
    seed: Option<u64>,
    max_attempts: Option<usize>,
    max_draws_per_complex: Option<usize>,
}

impl GenerationOverrides {
    fn from_set_values(set_values: &[String]) -> Result<Self> {
        let mut overrides = Self::default();
        for kv_pair in set_values {
            let (key, value) = split_set_value(kv_pair)?;
            match key {
                "seed" => overrides.seed = Some(parse_set_value(key, value, "integer")?),
                "max-attempts" => {
                    overrides.max_attempts = Some(parse_set_value(key, value, "integer")?)
                }
                "max-draws-per-complex" => {
                    overrides.max_draws_per_complex =
                        Some(parse_set_value(key, value, "integer")?)
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(overrides)
    }
}

/// Fully resolved generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    pub seed: Option<u64>,
    pub batches: Vec<GenerationConfig>,
}

impl PartialGenerationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    /// Resolves the final plan. CLI arguments win over `-S` values, which win
    /// over the file (a `[[batch]]` value before the top-level one). Without
    /// any `[[batch]]` table the CLI describes the single batch; otherwise
    /// batch arguments override every batch.
    pub fn merge_with_cli(mut self, args: &GenerateArgs) -> Result<GenerationPlan> {
        let overrides = GenerationOverrides::from_set_values(&args.set_values)?;

        if self.batch.is_empty() {
            self.batch.push(PartialBatchConfig::default());
        }
        let seed = args.seed.or(overrides.seed).or(self.seed);

        let batches = self
            .batch
            .iter()
            .enumerate()
            .map(|(idx, batch)| self.resolve_batch(idx, batch, &overrides, args))
            .collect::<Result<Vec<_>>>()?;

        Ok(GenerationPlan { seed, batches })
    }

    fn resolve_batch(
        &self,
        idx: usize,
        batch: &PartialBatchConfig,
        overrides: &GenerationOverrides,
        args: &GenerateArgs,
    ) -> Result<GenerationConfig> {
        let metal = require(idx, args.metal.clone().or(batch.metal.clone()), "metal")?;
        let oxidation_state = require(
            idx,
            args.oxidation_state.or(batch.oxidation_state),
            "oxidation-state",
        )?;
        let spin = require(idx, args.spin.or(batch.spin), "spin")?;
        let samples = require(idx, args.samples.or(batch.samples), "samples")?;
        let min_cn = require(idx, args.min_cn.or(batch.min_cn), "min-cn")?;
        let max_cn = require(idx, args.max_cn.or(batch.max_cn), "max-cn")?;

        let max_attempts = args
            .max_attempts
            .or(overrides.max_attempts)
            .or(batch.max_attempts)
            .or(self.max_attempts)
            .unwrap_or(core_config::DEFAULT_MAX_ATTEMPTS);
        let max_draws_per_complex = overrides
            .max_draws_per_complex
            .or(batch.max_draws_per_complex)
            .or(self.max_draws_per_complex)
            .unwrap_or(core_config::DEFAULT_MAX_DRAWS_PER_COMPLEX);

        GenerationConfigBuilder::new()
            .central_atom(&metal)
            .oxidation_state(oxidation_state)
            .spin(spin)
            .sample_count(samples)
            .coordination_range(min_cn, max_cn)
            .max_attempts(max_attempts)
            .max_draws_per_complex(max_draws_per_complex)
            .build()
            .map_err(|e| CliError::Config(format!("Batch {}: {}", idx + 1, e)))
    }
}

// --- Optimisation ---

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialBuilderConfig {
    command: Option<PathBuf>,
    #[serde(default)]
    args: Vec<String>,
}

/// Optimisation config file. `[settings]` is an open table handed to the
/// structure builder unchanged.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialOptimiserConfig {
    workers: Option<usize>,
    timeout_secs: Option<u64>,
    builder: Option<PartialBuilderConfig>,
    settings: Option<toml::Table>,
}

/// Fully resolved optimisation run.
#[derive(Debug)]
pub struct OptimisationPlan {
    pub config: OptimiserConfig,
    pub builder: ExternalCommand,
}

impl PartialOptimiserConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    pub fn merge_with_cli(
        mut self,
        args: &OptimiseArgs,
        threads: Option<usize>,
    ) -> Result<OptimisationPlan> {
        self.apply_set_values(&args.set_values)?;

        let builder_file = self.builder.take().unwrap_or_default();
        let program = args
            .builder
            .clone()
            .or(builder_file.command)
            .ok_or_else(|| {
                CliError::Config(
                    "A builder program is required either as `builder.command` in the config file or via --builder."
                        .to_string(),
                )
            })?;
        let builder_args = if args.builder_args.is_empty() {
            builder_file.args
        } else {
            args.builder_args.clone()
        };

        let timeout = args
            .timeout
            .or(self.timeout_secs)
            .map(Duration::from_secs);
        let settings = toml_table_to_json(self.settings.take().unwrap_or_default())?;

        let config = OptimiserConfigBuilder::new()
            .output_root(args.output.clone())
            .settings(settings)
            .workers(threads.or(self.workers).unwrap_or(1))
            .timeout(timeout)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let builder = ExternalCommand::new(program)
            .args(builder_args)
            .kill_after(timeout);

        Ok(OptimisationPlan { config, builder })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = split_set_value(kv_pair)?;
            match key {
                "workers" => self.workers = Some(parse_set_value(key, value, "integer")?),
                "timeout-secs" => {
                    self.timeout_secs = Some(parse_set_value(key, value, "integer")?)
                }
                "builder.command" => {
                    self.builder.get_or_insert_with(Default::default).command =
                        Some(PathBuf::from(value));
                }
                _ => match key.strip_prefix("settings.") {
                    Some(setting) if !setting.is_empty() => {
                        self.settings
                            .get_or_insert_with(Default::default)
                            .insert(setting.to_string(), parse_toml_scalar(value));
                    }
                    _ => {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{}'",
                            key
                        )));
                    }
                },
            }
        }
        Ok(())
    }
}

/// Interprets `value` as a TOML literal (`3`, `true`, `"x"`, `[1, 2]`),
/// falling back to a bare string.
fn parse_toml_scalar(value: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {}", value))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()))
}

fn toml_table_to_json(table: toml::Table) -> Result<Map<String, Value>> {
    match serde_json::to_value(table) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::Config(
            "`settings` must be a table".to_string(),
        )),
        Err(e) => Err(CliError::Config(format!("Invalid `settings` table: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn generate_args(extra: &[&str]) -> GenerateArgs {
        let mut argv = vec!["coordgen", "generate", "-l", "ligands.json", "-o", "out.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Generate(args) => args,
            other => panic!("Expected 'generate' subcommand, got {other:?}"),
        }
    }

    fn optimise_args(extra: &[&str]) -> OptimiseArgs {
        let mut argv = vec!["coordgen", "optimise", "-d", "data.json", "-o", "out"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Optimise(args) => args,
            other => panic!("Expected 'optimise' subcommand, got {other:?}"),
        }
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn generation_from_cli_only_builds_one_batch() {
        let args = generate_args(&[
            "--metal", "Nd", "--oxidation-state", "3", "--spin", "4", "-n", "10", "--min-cn",
            "6", "--max-cn", "8", "--seed", "42",
        ]);

        let plan = PartialGenerationConfig::default()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(plan.seed, Some(42));
        assert_eq!(plan.batches.len(), 1);
        let batch = &plan.batches[0];
        assert_eq!(batch.central_atom, "Nd");
        assert_eq!((batch.min_cn, batch.max_cn), (6, 8));
        assert_eq!(batch.max_attempts, core_config::DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn generation_file_batches_take_cli_overrides() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            seed = 7
            max-attempts = 500

            [[batch]]
            metal = "La"
            oxidation-state = 3
            spin = 1
            samples = 5
            min-cn = 4
            max-cn = 6

            [[batch]]
            metal = "U"
            oxidation-state = 4
            spin = 3
            samples = 2
            min-cn = 6
            max-cn = 6
            max-attempts = 50
            "#,
        );
        let args = generate_args(&["-n", "3", "-S", "seed=9"]);

        let plan = PartialGenerationConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(plan.seed, Some(9));
        assert_eq!(plan.batches.len(), 2);
        assert!(plan.batches.iter().all(|b| b.sample_count == 3));
        assert_eq!(plan.batches[0].max_attempts, 500);
        assert_eq!(plan.batches[1].max_attempts, 50);
        assert_eq!(plan.batches[1].central_atom, "U");
    }

    #[test]
    fn generation_set_values_win_over_batch_tables() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [[batch]]
            metal = "Eu"
            oxidation-state = 3
            spin = 7
            samples = 4
            min-cn = 6
            max-cn = 8
            max-attempts = 50
            max-draws-per-complex = 40
            "#,
        );
        let args = generate_args(&["-S", "max-attempts=7", "-S", "max-draws-per-complex=3"]);

        let plan = PartialGenerationConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(plan.batches[0].max_attempts, 7);
        assert_eq!(plan.batches[0].max_draws_per_complex, 3);
    }

    #[test]
    fn generation_cli_flag_wins_over_set_value() {
        let args = generate_args(&[
            "--metal", "Tb", "--oxidation-state", "3", "--spin", "7", "-n", "2", "--min-cn",
            "6", "--max-cn", "6", "--max-attempts", "11", "-S", "max-attempts=7", "-S",
            "seed=5",
        ]);

        let plan = PartialGenerationConfig::default()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(plan.batches[0].max_attempts, 11);
        assert_eq!(plan.seed, Some(5));
    }

    #[test]
    fn generation_reports_missing_field() {
        let args = generate_args(&["--metal", "La", "--spin", "1"]);
        let result = PartialGenerationConfig::default().merge_with_cli(&args);
        match result {
            Err(CliError::Config(msg)) => assert!(msg.contains("oxidation-state")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn generation_file_rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "sead = 3\n");
        assert!(matches!(
            PartialGenerationConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn generation_rejects_unknown_set_key() {
        let args = generate_args(&["-S", "metal=La"]);
        assert!(matches!(
            PartialGenerationConfig::default().merge_with_cli(&args),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn optimisation_settings_table_becomes_json() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            workers = 2
            timeout-secs = 300

            [builder]
            command = "python3"
            args = ["bridge.py"]

            [settings]
            full_method = "GFN2-xTB"
            full_max_steps = 1000
            "#,
        );
        let args = optimise_args(&["-S", "settings.full_spin=3"]);

        let plan = PartialOptimiserConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, None)
            .unwrap();

        assert_eq!(plan.config.workers, 2);
        assert_eq!(plan.config.timeout, Some(Duration::from_secs(300)));
        assert_eq!(plan.config.output_root, PathBuf::from("out"));
        assert_eq!(
            Value::Object(plan.config.settings),
            json!({"full_method": "GFN2-xTB", "full_max_steps": 1000, "full_spin": 3})
        );
    }

    #[test]
    fn optimisation_cli_wins_over_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "workers = 2\ntimeout-secs = 300\n[builder]\ncommand = \"python3\"\n",
        );
        let args = optimise_args(&["--builder", "./bridge", "-t", "10"]);

        let plan = PartialOptimiserConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, Some(8))
            .unwrap();

        assert_eq!(plan.config.workers, 8);
        assert_eq!(plan.config.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn optimisation_requires_a_builder() {
        let args = optimise_args(&[]);
        assert!(matches!(
            PartialOptimiserConfig::default().merge_with_cli(&args, None),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn set_values_parse_toml_literals() {
        assert_eq!(parse_toml_scalar("3"), toml::Value::Integer(3));
        assert_eq!(parse_toml_scalar("true"), toml::Value::Boolean(true));
        assert_eq!(
            parse_toml_scalar("GFN2-xTB"),
            toml::Value::String("GFN2-xTB".to_string())
        );
    }
}
