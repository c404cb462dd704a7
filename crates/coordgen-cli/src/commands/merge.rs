use crate::cli::MergeArgs;
use crate::error::Result;
use coordgen::core::io::dataset;
use coordgen::core::models::sample::Dataset;
use coordgen::engine::error::EngineError;
use std::collections::HashSet;
use tracing::{info, warn};

pub fn run(args: MergeArgs) -> Result<()> {
    let mut merged = Dataset::new();
    for path in &args.inputs {
        info!("Reading dataset {:?}", path);
        let part = dataset::read(path).map_err(EngineError::from)?;
        info!("{:?} holds {} sample(s).", path, part.len());
        merged = merged + part;
    }

    let unique: HashSet<&str> = merged.iter().map(|s| s.uid.as_str()).collect();
    let duplicates = merged.len() - unique.len();
    if duplicates > 0 {
        warn!(
            duplicates,
            "Merged inputs repeat some uids; the output keeps the last sample of each."
        );
    }

    dataset::write(&merged, &args.output).map_err(EngineError::from)?;
    println!(
        "✓ Merged {} file(s), {} sample(s) written to: {}",
        args.inputs.len(),
        merged.len() - duplicates,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordgen::core::models::complex::Complex;
    use coordgen::core::models::ligand::LigandSpec;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn dataset_with(cn: u32) -> Dataset {
        let water = LigandSpec::new("O", vec![0], "mono");
        let mut complex = Complex::new("Gd", 3, 8, cn).unwrap();
        for _ in 0..cn {
            complex.add_ligand(&water, "aqua").unwrap();
        }
        Dataset::from_samples(vec![complex.to_sample().unwrap()])
    }

    #[test]
    fn merge_keeps_argument_order_and_last_copy_of_repeated_uids() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = [(1, "a.json"), (2, "b.json"), (1, "c.json")]
            .iter()
            .map(|(cn, name)| {
                let path = dir.path().join(name);
                dataset::write(&dataset_with(*cn), &path).unwrap();
                path
            })
            .collect();
        let output = dir.path().join("merged.json");

        run(MergeArgs {
            inputs: paths,
            output: output.clone(),
        })
        .unwrap();

        let merged = dataset::read(&output).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].core.coordination_number, 1);
        assert_eq!(merged[1].core.coordination_number, 2);
    }
}
