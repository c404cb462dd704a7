use crate::core::models::ligand::{LigandCatalog, LigandSpec};
use rand::Rng;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("Cannot draw a ligand from an empty catalog")]
    EmptyCatalog,
    #[error("Invalid coordination range {min}..={max}")]
    InvalidRange { min: u32, max: u32 },
}

/// Draws a coordination number uniformly from `min..=max`.
pub fn draw_coordination_number(min: u32, max: u32, rng: &mut impl Rng) -> Result<u32, SamplingError> {
    if min == 0 || max < min {
        return Err(SamplingError::InvalidRange { min, max });
    }
    Ok(rng.gen_range(min..=max))
}

/// Draws one catalog entry uniformly, with replacement.
#[instrument(level = "trace", skip_all)]
pub fn draw_ligand<'c>(
    catalog: &'c LigandCatalog,
    rng: &mut impl Rng,
) -> Result<(&'c str, &'c LigandSpec), SamplingError> {
    if catalog.is_empty() {
        return Err(SamplingError::EmptyCatalog);
    }
    let index = rng.gen_range(0..catalog.len());
    catalog.entry(index).ok_or(SamplingError::EmptyCatalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn catalog() -> LigandCatalog {
        LigandCatalog::from_entries([
            ("A".to_string(), LigandSpec::new("O", vec![0], "mono")),
            ("B".to_string(), LigandSpec::new("OCCO", vec![0, 3], "bi_cis")),
            ("C".to_string(), LigandSpec::new("N", vec![0], "mono")),
        ])
        .unwrap()
    }

    #[test]
    fn coordination_numbers_cover_the_inclusive_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let seen: HashSet<u32> = (0..500)
            .map(|_| draw_coordination_number(4, 6, &mut rng).unwrap())
            .collect();
        assert_eq!(seen, HashSet::from([4, 5, 6]));
    }

    #[test]
    fn degenerate_range_always_returns_its_single_value() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(draw_coordination_number(3, 3, &mut rng), Ok(3));
        }
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            draw_coordination_number(5, 4, &mut rng),
            Err(SamplingError::InvalidRange { min: 5, max: 4 })
        );
        assert!(draw_coordination_number(0, 4, &mut rng).is_err());
    }

    #[test]
    fn ligand_draws_reach_every_entry() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(42);
        let seen: HashSet<&str> = (0..300)
            .map(|_| draw_ligand(&catalog, &mut rng).unwrap().0)
            .collect();
        assert_eq!(seen, HashSet::from(["A", "B", "C"]));
    }

    #[test]
    fn same_seed_gives_same_draws() {
        let catalog = catalog();
        let draws = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| draw_ligand(&catalog, &mut rng).unwrap().0.to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(draws(9), draws(9));
    }
}
