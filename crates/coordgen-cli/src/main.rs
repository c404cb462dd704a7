mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use color_eyre::config::PanicHook;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Routes color-eyre panic reports to `sink` instead of stderr.
fn report_panics<F>(panic_hook: PanicHook, sink: F)
where
    F: Fn(String) + Send + Sync + 'static,
{
    std::panic::set_hook(Box::new(move |pi| {
        sink(panic_hook.panic_report(pi).to_string());
    }));
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    report_panics(panic_hook, |report| error!("{}", report));

    info!(
        "🚀 coordgen CLI v{} starting up.",
        env!("CARGO_PKG_VERSION")
    );
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let threads = cli.threads;
    let command_result = match cli.command {
        Commands::Generate(args) => {
            info!("Dispatching to 'generate' command.");
            commands::generate::run(args)
        }
        Commands::Merge(args) => {
            info!("Dispatching to 'merge' command.");
            commands::merge::run(args)
        }
        Commands::Optimise(args) => {
            info!("Dispatching to 'optimise' command.");
            commands::optimise::run(args, threads)
        }
        Commands::Mutate(args) => {
            info!("Dispatching to 'mutate' command.");
            commands::mutate::run(args)
        }
    };

    match &command_result {
        Ok(_) => {
            info!("✅ Command completed successfully.");
            println!("✅ Command completed successfully.");
        }
        Err(e) => error!("❌ Command failed: {}", e),
    }
    command_result
}
