use nalgebra::Point3;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct XyzAtom {
    pub element: String,
    pub position: Point3<f64>,
}

/// A molecule in XYZ form: atom count line, comment line, then `element x y z` rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XyzMolecule {
    pub comment: String,
    pub atoms: Vec<XyzAtom>,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("No '@<TRIPOS>ATOM' section found in mol2 block")]
    MissingAtomSection,
}

impl XyzMolecule {
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.atoms.iter().map(|a| a.element.as_str())
    }

    /// Parses XYZ text. The first two lines are header lines; any following
    /// line with fewer than four fields is skipped.
    pub fn parse(content: &str) -> Result<Self, XyzError> {
        let mut lines = content.lines();
        lines.next();
        let comment = lines.next().unwrap_or("").trim_end().to_string();

        let mut atoms = Vec::new();
        for (offset, line) in lines.enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 4 {
                continue;
            }
            let line_no = offset + 3;
            let coord = |s: &str| {
                s.parse::<f64>().map_err(|_| XyzError::Parse {
                    line: line_no,
                    message: format!("invalid coordinate '{}'", s),
                })
            };
            atoms.push(XyzAtom {
                element: tokens[0].to_string(),
                position: Point3::new(coord(tokens[1])?, coord(tokens[2])?, coord(tokens[3])?),
            });
        }
        Ok(Self { comment, atoms })
    }

    pub fn read_from_path(path: &Path) -> Result<Self, XyzError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn to_xyz_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.atoms.len());
        let _ = writeln!(out, "{}", self.comment);
        for atom in &self.atoms {
            let _ = writeln!(
                out,
                "{:<3} {:>14.6} {:>14.6} {:>14.6}",
                atom.element, atom.position.x, atom.position.y, atom.position.z
            );
        }
        out
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), XyzError> {
        std::fs::write(path, self.to_xyz_string())?;
        Ok(())
    }

    /// Extracts the atoms of a Tripos mol2 block.
    ///
    /// The element is taken from the SYBYL atom type (`C.ar` -> `C`), falling
    /// back to the leading letters of the atom name.
    pub fn from_mol2(content: &str) -> Result<Self, XyzError> {
        let mut comment = String::new();
        let mut in_molecule = false;
        let mut in_atoms = false;
        let mut seen_atoms = false;
        let mut atoms = Vec::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if let Some(section) = line.strip_prefix("@<TRIPOS>") {
                in_molecule = section == "MOLECULE";
                in_atoms = section == "ATOM";
                seen_atoms |= in_atoms;
                continue;
            }
            if in_molecule {
                if comment.is_empty() && !line.is_empty() {
                    comment = line.to_string();
                }
                continue;
            }
            if !in_atoms || line.is_empty() {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 5 {
                return Err(XyzError::Parse {
                    line: idx + 1,
                    message: "mol2 atom record needs at least 5 fields".to_string(),
                });
            }
            let coord = |s: &str| {
                s.parse::<f64>().map_err(|_| XyzError::Parse {
                    line: idx + 1,
                    message: format!("invalid coordinate '{}'", s),
                })
            };
            let element = tokens
                .get(5)
                .copied()
                .map(|ty| ty.split('.').next().unwrap_or(ty))
                .filter(|sym| !sym.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| element_from_atom_name(tokens[1]));

            atoms.push(XyzAtom {
                element,
                position: Point3::new(coord(tokens[2])?, coord(tokens[3])?, coord(tokens[4])?),
            });
        }

        if !seen_atoms {
            return Err(XyzError::MissingAtomSection);
        }
        Ok(Self { comment, atoms })
    }
}

fn element_from_atom_name(name: &str) -> String {
    name.chars().take_while(|c| c.is_ascii_alphabetic()).collect()
}

/// Rewrites every atom line that mentions `old` as a field so that its
/// element becomes `new`. Header lines and all other lines are kept verbatim.
pub fn replace_element(content: &str, old: &str, new: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        if idx >= 2 && tokens.contains(&old) {
            tokens[0] = new;
            out.push_str(&tokens.join("  "));
            out.push_str("  \n");
        } else {
            out.push_str(line);
        }
    }
    out
}
