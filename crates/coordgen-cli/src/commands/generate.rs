use crate::cli::GenerateArgs;
use crate::config::PartialGenerationConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use coordgen::{
    core::{io::dataset, models::ligand::LigandCatalog},
    engine::{error::EngineError, progress::ProgressReporter},
    workflows,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

pub fn run(args: GenerateArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialGenerationConfig::from_file(path)?,
        None => PartialGenerationConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let plan = partial_config.merge_with_cli(&args)?;

    info!("Loading ligand catalog from {:?}", &args.ligands);
    let catalog = LigandCatalog::load(&args.ligands).map_err(EngineError::from)?;
    info!("Catalog holds {} ligand(s).", catalog.len());

    let mut rng = match plan.seed {
        Some(seed) => {
            info!(seed, "Using a seeded random number generator.");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Generating {} batch(es) of complexes...",
        plan.batches.len()
    );
    let dataset = workflows::generate::run_many(&catalog, &plan.batches, &mut rng, &reporter)?;

    info!("Writing {} sample(s) to {:?}", dataset.len(), &args.output);
    dataset::write(&dataset, &args.output).map_err(EngineError::from)?;
    println!(
        "✓ {} sample(s) written to: {}",
        dataset.len(),
        args.output.display()
    );
    Ok(())
}
