use crate::cli::OptimiseArgs;
use crate::config::PartialOptimiserConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use coordgen::{
    core::io::dataset,
    engine::{error::EngineError, progress::ProgressReporter},
    workflows::optimise::Optimiser,
};
use std::sync::Arc;
use tracing::{info, warn};

pub fn run(args: OptimiseArgs, threads: Option<usize>) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialOptimiserConfig::from_file(path)?,
        None => PartialOptimiserConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let plan = partial_config.merge_with_cli(&args, threads)?;

    info!("Loading dataset from {:?}", &args.dataset);
    let dataset = dataset::read(&args.dataset).map_err(EngineError::from)?;

    let workers = plan.config.workers;
    let optimiser = Optimiser::new(plan.config, Arc::new(plan.builder))?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Optimising {} sample(s) with {} worker(s)...",
        dataset.len(),
        workers
    );
    let summary = optimiser.run(&dataset, &reporter)?;

    println!(
        "✓ {}/{} sample(s) optimised into: {}",
        summary.succeeded,
        summary.total,
        args.output.display()
    );
    if !summary.failed.is_empty() {
        warn!(failed = summary.failed.len(), "Some samples failed.");
        println!(
            "  {} sample(s) failed; see the '.err' file in each sample directory.",
            summary.failed.len()
        );
    }
    Ok(())
}
