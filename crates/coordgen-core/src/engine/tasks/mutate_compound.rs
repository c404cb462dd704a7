use crate::core::elements::{CentralAtomTable, MAX_OXIDATION_STATE};
use crate::core::io::artifacts::{
    self, ArtifactError, CHARGE_FILE, GEOMETRY_FILE, UNPAIRED_ELECTRONS_FILE,
};
use crate::core::io::xyz::{self, XyzError, XyzMolecule};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Required file '{file}' not found in '{dir}'")]
    MissingRequiredFile { file: &'static str, dir: String },
    #[error("Expected exactly one lanthanide or actinide atom, found {0}")]
    CentralAtom(String),
    #[error("Element '{0}' is neither a lanthanide nor an actinide")]
    UnsupportedElement(String),
    #[error("No multiplicity known for {element} in oxidation state {oxidation_state}")]
    MissingMultiplicity {
        element: String,
        oxidation_state: i32,
    },
    #[error("Oxidation state {0} is not supported (maximum is {MAX_OXIDATION_STATE})")]
    UnsupportedOxidationState(i32),
    #[error("Geometry error: {0}")]
    Xyz(#[from] XyzError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// One substitution of the central atom.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Substitution {
    element: String,
    total_charge: i64,
    unpaired_electrons: i64,
}

pub fn mutated_uid(uid: &str, element: &str, new_oxidation_state: i32) -> String {
    format!("{}_mutated_{}_{}", uid, element, new_oxidation_state)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MutationError + '_ {
    move |e| MutationError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    }
}

/// Returns the single lanthanide/actinide element of `molecule`.
fn find_central_atom(
    molecule: &XyzMolecule,
    table: &CentralAtomTable,
) -> Result<String, MutationError> {
    let central: Vec<&str> = molecule
        .elements()
        .filter(|e| table.is_central_atom(e))
        .collect();
    match central.as_slice() {
        [single] => Ok(single.to_string()),
        [] => Err(MutationError::CentralAtom("none".to_string())),
        many => Err(MutationError::CentralAtom(format!(
            "{} ({})",
            many.len(),
            many.join(", ")
        ))),
    }
}

/// Writes every series sibling of the compound in `compound_dir` to
/// `output_dir/{uid}_mutated_{element}_{new_os}` and returns the new
/// directories.
///
/// All substitutions are resolved before the first file is written, so a
/// missing multiplicity leaves no partial output behind.
pub fn run(
    compound_dir: &Path,
    output_dir: &Path,
    oxidation_state: i32,
    new_oxidation_state: i32,
    table: &CentralAtomTable,
) -> Result<Vec<PathBuf>, MutationError> {
    if new_oxidation_state > MAX_OXIDATION_STATE {
        return Err(MutationError::UnsupportedOxidationState(new_oxidation_state));
    }
    for file in [GEOMETRY_FILE, CHARGE_FILE, UNPAIRED_ELECTRONS_FILE] {
        if !compound_dir.join(file).is_file() {
            return Err(MutationError::MissingRequiredFile {
                file,
                dir: compound_dir.to_string_lossy().to_string(),
            });
        }
    }

    let geometry_path = compound_dir.join(GEOMETRY_FILE);
    let geometry = std::fs::read_to_string(&geometry_path).map_err(io_error(&geometry_path))?;
    let molecule = XyzMolecule::parse(&geometry)?;
    let central_atom = find_central_atom(&molecule, table)?;
    let series = table
        .series_of(&central_atom)
        .ok_or_else(|| MutationError::UnsupportedElement(central_atom.clone()))?;

    let charge = artifacts::read_integer(&compound_dir.join(CHARGE_FILE))?;
    let total_charge = charge - i64::from(oxidation_state) + i64::from(new_oxidation_state);

    let substitutions = table
        .members(series)
        .filter(|element| *element != central_atom)
        .map(|element| {
            let multiplicity = table
                .multiplicity(element, new_oxidation_state)
                .ok_or_else(|| MutationError::MissingMultiplicity {
                    element: element.to_string(),
                    oxidation_state: new_oxidation_state,
                })?;
            Ok(Substitution {
                element: element.to_string(),
                total_charge,
                unpaired_electrons: i64::from(multiplicity) - 1,
            })
        })
        .collect::<Result<Vec<_>, MutationError>>()?;

    let uid = compound_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut created = Vec::with_capacity(substitutions.len());
    for sub in substitutions {
        let target = output_dir.join(mutated_uid(&uid, &sub.element, new_oxidation_state));
        std::fs::create_dir_all(&target).map_err(io_error(&target))?;

        let target_geometry = target.join(GEOMETRY_FILE);
        std::fs::write(
            &target_geometry,
            xyz::replace_element(&geometry, &central_atom, &sub.element),
        )
        .map_err(io_error(&target_geometry))?;
        artifacts::write_integer(&target.join(CHARGE_FILE), sub.total_charge)?;
        artifacts::write_integer(&target.join(UNPAIRED_ELECTRONS_FILE), sub.unpaired_electrons)?;

        debug!(from = %central_atom, to = %sub.element, dir = ?target, "Wrote mutated compound.");
        created.push(target);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::elements::Series;
    use tempfile::tempdir;

    const CE_COMPLEX: &str = "3\nCe aqua\nCe 0.0 0.0 0.0\nO 2.4 0.0 0.0\nH 2.9 0.8 0.0\n";

    fn table(new_os: i32) -> CentralAtomTable {
        let standard = CentralAtomTable::standard();
        let members: Vec<String> = standard
            .members(Series::Lanthanide)
            .map(str::to_string)
            .collect();
        members
            .iter()
            .enumerate()
            .fold(standard, |t, (i, el)| {
                t.with_multiplicity(el, new_os, (i % 7) as i32 + 1)
            })
    }

    fn compound(root: &Path, uid: &str, xyz: &str, charge: i64) -> PathBuf {
        let dir = root.join(uid);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(GEOMETRY_FILE), xyz).unwrap();
        std::fs::write(dir.join(CHARGE_FILE), charge.to_string()).unwrap();
        std::fs::write(dir.join(UNPAIRED_ELECTRONS_FILE), "1").unwrap();
        dir
    }

    #[test]
    fn mutates_into_every_other_lanthanide() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let dir = compound(input.path(), "abc", CE_COMPLEX, 1);
        let table = table(4);

        let created = run(&dir, output.path(), 3, 4, &table).unwrap();

        assert_eq!(created.len(), 14);
        let nd = output.path().join("abc_mutated_Nd_4");
        assert!(created.contains(&nd));
        assert!(!output.path().join("abc_mutated_Ce_4").exists());

        assert_eq!(artifacts::read_integer(&nd.join(CHARGE_FILE)).unwrap(), 2);
        let expected_uhf = i64::from(table.multiplicity("Nd", 4).unwrap()) - 1;
        assert_eq!(
            artifacts::read_integer(&nd.join(UNPAIRED_ELECTRONS_FILE)).unwrap(),
            expected_uhf
        );

        let mutated = XyzMolecule::read_from_path(&nd.join(GEOMETRY_FILE)).unwrap();
        assert_eq!(mutated.elements().collect::<Vec<_>>(), vec!["Nd", "O", "H"]);
        assert_eq!(mutated.comment, "Ce aqua");
    }

    #[test]
    fn missing_charge_file_is_reported() {
        let input = tempdir().unwrap();
        let dir = compound(input.path(), "abc", CE_COMPLEX, 1);
        std::fs::remove_file(dir.join(CHARGE_FILE)).unwrap();

        let err = run(&dir, input.path(), 3, 3, &table(3)).unwrap_err();

        assert!(matches!(
            err,
            MutationError::MissingRequiredFile { file: CHARGE_FILE, .. }
        ));
    }

    #[test]
    fn two_central_atoms_are_rejected() {
        let input = tempdir().unwrap();
        let xyz = "2\n\nCe 0 0 0\nU 0 0 3\n";
        let dir = compound(input.path(), "pair", xyz, 0);

        let err = run(&dir, input.path(), 3, 3, &table(3)).unwrap_err();

        assert!(matches!(err, MutationError::CentralAtom(_)));
    }

    #[test]
    fn compound_without_central_atom_is_rejected() {
        let input = tempdir().unwrap();
        let dir = compound(input.path(), "water", "1\n\nO 0 0 0\n", 0);

        assert!(matches!(
            run(&dir, input.path(), 3, 3, &table(3)),
            Err(MutationError::CentralAtom(_))
        ));
    }

    #[test]
    fn missing_multiplicity_writes_nothing() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let dir = compound(input.path(), "abc", CE_COMPLEX, 1);
        let sparse = CentralAtomTable::standard().with_multiplicity("La", 3, 1);

        let err = run(&dir, output.path(), 3, 3, &sparse).unwrap_err();

        assert!(matches!(err, MutationError::MissingMultiplicity { .. }));
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn oxidation_states_above_six_are_rejected() {
        let input = tempdir().unwrap();
        let dir = compound(input.path(), "abc", CE_COMPLEX, 1);

        assert!(matches!(
            run(&dir, input.path(), 3, 7, &table(7)),
            Err(MutationError::UnsupportedOxidationState(7))
        ));
    }
}
