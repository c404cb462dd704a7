use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "coordgen developers",
    version,
    about = "coordgen - generate datasets of lanthanide and actinide coordination complexes and optimise them in batch.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of parallel workers for batch optimisation.
    /// Overrides `workers` from the config file.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample unique coordination complexes from a ligand catalog into a dataset file.
    Generate(GenerateArgs),
    /// Concatenate several dataset files into one.
    Merge(MergeArgs),
    /// Optimise every sample of a dataset with an external structure builder.
    Optimise(OptimiseArgs),
    /// Swap the central atom of optimised compounds for its series siblings.
    Mutate(MutateArgs),
}

/// Arguments for the `generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to the ligand catalog (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub ligands: PathBuf,

    /// Path for the output dataset file (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a generation config file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Batch Overrides ---
    /// Central atom symbol (e.g., 'La').
    #[arg(short, long, value_name = "SYMBOL")]
    pub metal: Option<String>,

    /// Oxidation state of the central atom.
    #[arg(long, value_name = "INT", allow_negative_numbers = true)]
    pub oxidation_state: Option<i32>,

    /// Spin multiplicity (2S+1).
    #[arg(long, value_name = "INT")]
    pub spin: Option<i32>,

    /// Number of unique complexes to generate.
    #[arg(short = 'n', long, value_name = "INT")]
    pub samples: Option<usize>,

    /// Smallest coordination number to draw.
    #[arg(long, value_name = "INT")]
    pub min_cn: Option<u32>,

    /// Largest coordination number to draw.
    #[arg(long, value_name = "INT")]
    pub max_cn: Option<u32>,

    // --- Sampling Overrides ---
    /// Seed for the random number generator. Omit for a non-reproducible run.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Consecutive unsuccessful attempts tolerated before giving up.
    #[arg(long, value_name = "INT")]
    pub max_attempts: Option<usize>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S max-attempts=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `merge` subcommand.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Dataset files to concatenate, in order.
    #[arg(required = true, num_args(1..), value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Path for the merged dataset file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `optimise` subcommand.
#[derive(Args, Debug)]
pub struct OptimiseArgs {
    /// Path to the dataset file to optimise.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub dataset: PathBuf,

    /// Output root; one directory per sample uid is created below it.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to an optimisation config file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Program that builds a structure: reads a JSON request on stdin and
    /// writes a JSON result on stdout.
    #[arg(short, long, value_name = "PROGRAM")]
    pub builder: Option<PathBuf>,

    /// Extra argument passed to the builder program. Can be used multiple times.
    #[arg(long = "builder-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub builder_args: Vec<String>,

    /// Per-sample time limit in seconds.
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S settings.full_method=UFF
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `mutate` subcommand.
#[derive(Args, Debug)]
pub struct MutateArgs {
    /// Directory holding one sub-directory per optimised compound.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory receiving the mutated compounds.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Oxidation state of the central atom in the input compounds.
    #[arg(long, required = true, value_name = "INT", allow_negative_numbers = true)]
    pub oxidation_state: i32,

    /// Oxidation state of the central atom after mutation (at most 6).
    #[arg(long, required = true, value_name = "INT", allow_negative_numbers = true)]
    pub new_oxidation_state: i32,

    /// Multiplicity table (`;`-separated CSV with an `element` column and
    /// one column per oxidation state). Can be used multiple times.
    #[arg(short = 'm', long = "multiplicities", required = true, value_name = "PATH")]
    pub multiplicity_tables: Vec<PathBuf>,
}
