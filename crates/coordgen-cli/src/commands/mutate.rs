use crate::cli::MutateArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use coordgen::{
    core::elements::CentralAtomTable,
    engine::{config::MutationConfig, error::EngineError, progress::ProgressReporter},
    workflows::mutate::Mutator,
};
use tracing::info;

pub fn run(args: MutateArgs) -> Result<()> {
    let mut table = CentralAtomTable::standard();
    for path in &args.multiplicity_tables {
        info!("Loading multiplicity table {:?}", path);
        table = table.load_multiplicities(path).map_err(EngineError::from)?;
    }

    let config = MutationConfig {
        input_dir: args.input.clone(),
        output_dir: args.output.clone(),
        oxidation_state: args.oxidation_state,
        new_oxidation_state: args.new_oxidation_state,
    };
    let mutator = Mutator::new(config, table)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Mutating compounds in {}...", args.input.display());
    let report = mutator.run(&reporter)?;

    println!(
        "✓ {} mutated compound(s) written to: {}",
        report.created.len(),
        args.output.display()
    );
    for (dir, error) in &report.failures {
        println!("  ✗ {}: {}", dir.display(), error);
    }
    Ok(())
}
