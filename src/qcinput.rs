//! Q-Chem input file model.
//!
//! This module models the section-based Q-Chem input format and provides
//! rendering, parsing, and field-wise comparison. An input file consists of
//! `$section ... $end` blocks:
//!
//! ```text
//! $molecule
//!  0 1
//!  O       0.0000000000     0.0000000000     0.0000000000
//! $end
//!
//! $rem
//!    job_type = force
//!    method = wb97xv
//! $end
//! ```
//!
//! The `$molecule` block holds charge, spin multiplicity, and Cartesian
//! sites. The `$rem` block holds `key = value` keywords; the solvation
//! blocks (`$pcm`, `$solvent`, `$smx`) use plain `key value` lines. Keys are
//! case-insensitive and normalized to lowercase here.
//!
//! Parsing accepts both separator styles in every block and ignores unknown
//! sections, so recorded reference inputs from real runs load cleanly.

use crate::geometry::Geometry;
use crate::io;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error type for input-file parsing and writing.
#[derive(Error, Debug)]
pub enum QcInputError {
    /// I/O error when reading or writing input files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed input content
    #[error("Invalid Q-Chem input: {0}")]
    Parse(String),
}

type Result<T> = std::result::Result<T, QcInputError>;

/// The `$molecule` block: charge, spin multiplicity, and atomic sites.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeBlock {
    /// Total molecular charge
    pub charge: i32,
    /// Spin multiplicity (2S + 1)
    pub spin_multiplicity: u32,
    /// Atomic sites
    pub geometry: Geometry,
}

/// A complete Q-Chem input file.
///
/// Only the sections generated by this workflow are modeled: `$molecule`,
/// `$rem`, and the solvation blocks. Keyword maps are ordered (`BTreeMap`)
/// so rendering is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct QcInput {
    /// The `$molecule` block
    pub molecule: MoleculeBlock,
    /// `$rem` keywords
    pub rem: BTreeMap<String, String>,
    /// `$pcm` keywords (empty when PCM is not in use)
    pub pcm: BTreeMap<String, String>,
    /// `$solvent` keywords (PCM dielectric)
    pub solvent: BTreeMap<String, String>,
    /// `$smx` keywords (SMD solvent)
    pub smx: BTreeMap<String, String>,
}

impl QcInput {
    /// Create an input with the given molecule block and empty keyword maps.
    pub fn new(molecule: MoleculeBlock) -> Self {
        Self {
            molecule,
            rem: BTreeMap::new(),
            pcm: BTreeMap::new(),
            solvent: BTreeMap::new(),
            smx: BTreeMap::new(),
        }
    }

    /// Insert a `$rem` keyword (key normalized to lowercase).
    pub fn set_rem(&mut self, key: &str, value: impl Into<String>) {
        self.rem.insert(key.to_lowercase(), value.into());
    }

    /// Apply raw section overrides on top of the assembled input.
    ///
    /// `overrides` maps section name to key/value pairs. Keys already present
    /// are replaced; unknown sections are an error so typos do not silently
    /// vanish.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Result<()> {
        for (section, kv) in overrides {
            let map = match section.to_lowercase().as_str() {
                "rem" => &mut self.rem,
                "pcm" => &mut self.pcm,
                "solvent" => &mut self.solvent,
                "smx" => &mut self.smx,
                other => {
                    return Err(QcInputError::Parse(format!(
                        "unsupported input section override: {}",
                        other
                    )))
                }
            };
            for (k, v) in kv {
                map.insert(k.to_lowercase(), v.clone());
            }
        }
        Ok(())
    }

    /// Parse an input file, transparently handling gzipped files.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = io::read_to_string_auto(path)?;
        content.parse()
    }

    /// Write the rendered input to a plain-text file.
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Write the rendered input to a gzip-compressed file.
    pub fn write_gzip(&self, path: &Path) -> Result<()> {
        io::write_gzip(path, &self.to_string())?;
        Ok(())
    }

    /// Field-wise comparison against another input.
    ///
    /// All keyword sections and the molecule charge/spin/elements must match
    /// exactly; site coordinates are compared within `coord_tol` (Angstrom).
    /// Returns a description of the first mismatch.
    pub fn nearly_equal(&self, other: &QcInput, coord_tol: f64) -> std::result::Result<(), String> {
        if self.molecule.charge != other.molecule.charge {
            return Err(format!(
                "charge mismatch: {} vs {}",
                self.molecule.charge, other.molecule.charge
            ));
        }
        if self.molecule.spin_multiplicity != other.molecule.spin_multiplicity {
            return Err(format!(
                "spin multiplicity mismatch: {} vs {}",
                self.molecule.spin_multiplicity, other.molecule.spin_multiplicity
            ));
        }
        if self.molecule.geometry.elements != other.molecule.geometry.elements {
            return Err("element list mismatch".to_string());
        }
        for i in 0..self.molecule.geometry.num_atoms {
            let a = self.molecule.geometry.get_atom_coords(i);
            let b = other.molecule.geometry.get_atom_coords(i);
            for j in 0..3 {
                if (a[j] - b[j]).abs() > coord_tol {
                    return Err(format!(
                        "site {} coordinate {} mismatch: {} vs {}",
                        i, j, a[j], b[j]
                    ));
                }
            }
        }
        for (name, mine, theirs) in [
            ("rem", &self.rem, &other.rem),
            ("pcm", &self.pcm, &other.pcm),
            ("solvent", &self.solvent, &other.solvent),
            ("smx", &self.smx, &other.smx),
        ] {
            if mine != theirs {
                return Err(format!("${} section mismatch: {:?} vs {:?}", name, mine, theirs));
            }
        }
        Ok(())
    }
}

impl fmt::Display for QcInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "$molecule")?;
        writeln!(
            f,
            " {} {}",
            self.molecule.charge, self.molecule.spin_multiplicity
        )?;
        let geom = &self.molecule.geometry;
        for i in 0..geom.num_atoms {
            let xyz = geom.get_atom_coords(i);
            writeln!(
                f,
                " {:<2}  {:>16.10}  {:>16.10}  {:>16.10}",
                geom.elements[i], xyz[0], xyz[1], xyz[2]
            )?;
        }
        writeln!(f, "$end")?;

        writeln!(f, "\n$rem")?;
        for (k, v) in &self.rem {
            writeln!(f, "   {} = {}", k, v)?;
        }
        writeln!(f, "$end")?;

        for (name, map) in [
            ("pcm", &self.pcm),
            ("solvent", &self.solvent),
            ("smx", &self.smx),
        ] {
            if map.is_empty() {
                continue;
            }
            writeln!(f, "\n${}", name)?;
            for (k, v) in map {
                writeln!(f, "   {} {}", k, v)?;
            }
            writeln!(f, "$end")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for QcInput {
    type Err = QcInputError;

    fn from_str(content: &str) -> Result<Self> {
        let mut molecule: Option<MoleculeBlock> = None;
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

        let mut current: Option<String> = None;
        let mut block_lines: Vec<String> = Vec::new();

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() && current.is_none() {
                continue;
            }
            if let Some(name) = line.strip_prefix('$') {
                if name.eq_ignore_ascii_case("end") {
                    let section = current.take().ok_or_else(|| {
                        QcInputError::Parse("$end outside of a section".to_string())
                    })?;
                    if section == "molecule" {
                        molecule = Some(parse_molecule_block(&block_lines)?);
                    } else {
                        sections.insert(section, parse_keyword_block(&block_lines));
                    }
                    block_lines.clear();
                } else {
                    if current.is_some() {
                        return Err(QcInputError::Parse(format!(
                            "nested section ${} before $end",
                            name
                        )));
                    }
                    current = Some(name.to_lowercase());
                }
            } else if current.is_some() {
                if !line.is_empty() {
                    block_lines.push(line.to_string());
                }
            }
        }

        if current.is_some() {
            return Err(QcInputError::Parse("unterminated section".to_string()));
        }

        let molecule = molecule
            .ok_or_else(|| QcInputError::Parse("missing $molecule section".to_string()))?;

        let mut input = QcInput::new(molecule);
        if let Some(rem) = sections.remove("rem") {
            input.rem = rem;
        }
        if let Some(pcm) = sections.remove("pcm") {
            input.pcm = pcm;
        }
        if let Some(solvent) = sections.remove("solvent") {
            input.solvent = solvent;
        }
        if let Some(smx) = sections.remove("smx") {
            input.smx = smx;
        }
        // Remaining sections (e.g. $opt, $basis from hand-edited files) are ignored.
        Ok(input)
    }
}

fn parse_molecule_block(lines: &[String]) -> Result<MoleculeBlock> {
    let header = lines
        .first()
        .ok_or_else(|| QcInputError::Parse("empty $molecule section".to_string()))?;
    let mut parts = header.split_whitespace();
    let charge: i32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| QcInputError::Parse(format!("bad charge/multiplicity line: {}", header)))?;
    let spin_multiplicity: u32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| QcInputError::Parse(format!("bad charge/multiplicity line: {}", header)))?;

    let mut elements = Vec::new();
    let mut coords = Vec::new();
    for line in &lines[1..] {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(QcInputError::Parse(format!("bad site line: {}", line)));
        }
        elements.push(parts[0].to_string());
        for part in &parts[1..4] {
            coords.push(
                part.parse::<f64>()
                    .map_err(|_| QcInputError::Parse(format!("bad coordinate: {}", part)))?,
            );
        }
    }

    Ok(MoleculeBlock {
        charge,
        spin_multiplicity,
        geometry: Geometry::new(elements, coords),
    })
}

fn parse_keyword_block(lines: &[String]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for line in lines {
        let (key, value) = if let Some(eq) = line.find('=') {
            (line[..eq].trim(), line[eq + 1..].trim())
        } else {
            match line.split_once(char::is_whitespace) {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (line.as_str(), ""),
            }
        };
        if !key.is_empty() {
            map.insert(key.to_lowercase(), value.to_string());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_input() -> QcInput {
        let molecule = MoleculeBlock {
            charge: 0,
            spin_multiplicity: 1,
            geometry: Geometry::new(
                vec!["O".to_string(), "H".to_string(), "H".to_string()],
                vec![0.0, 0.0, 0.0, 0.757, 0.586, 0.0, -0.757, 0.586, 0.0],
            ),
        };
        let mut input = QcInput::new(molecule);
        input.set_rem("job_type", "force");
        input.set_rem("method", "wb97xv");
        input.set_rem("basis", "def2-tzvpd");
        input
    }

    #[test]
    fn test_render_parse_round_trip() {
        let input = water_input();
        let parsed: QcInput = input.to_string().parse().unwrap();
        assert!(parsed.nearly_equal(&input, 1e-9).is_ok());
    }

    #[test]
    fn test_parse_space_separated_keywords() {
        let text = "$molecule\n 0 1\n H 0.0 0.0 0.0\n$end\n$rem\n   job_type force\n$end\n";
        let parsed: QcInput = text.parse().unwrap();
        assert_eq!(parsed.rem.get("job_type").unwrap(), "force");
    }

    #[test]
    fn test_overrides_replace_and_add() {
        let mut input = water_input();
        let mut rem = BTreeMap::new();
        rem.insert("mem_total".to_string(), "170000".to_string());
        rem.insert("method".to_string(), "b97mv".to_string());
        let mut overrides = BTreeMap::new();
        overrides.insert("rem".to_string(), rem);

        input.apply_overrides(&overrides).unwrap();
        assert_eq!(input.rem.get("mem_total").unwrap(), "170000");
        assert_eq!(input.rem.get("method").unwrap(), "b97mv");
    }

    #[test]
    fn test_unknown_override_section_rejected() {
        let mut input = water_input();
        let mut overrides = BTreeMap::new();
        overrides.insert("velocity".to_string(), BTreeMap::new());
        assert!(input.apply_overrides(&overrides).is_err());
    }

    #[test]
    fn test_nearly_equal_detects_coordinate_drift() {
        let a = water_input();
        let mut b = water_input();
        b.molecule.geometry.set_atom_coords(1, [0.757, 0.587, 0.0]);
        assert!(a.nearly_equal(&b, 1e-6).is_err());
        assert!(a.nearly_equal(&b, 1e-2).is_ok());
    }

    #[test]
    fn test_missing_molecule_is_error() {
        let text = "$rem\n   method = wb97xv\n$end\n";
        assert!(text.parse::<QcInput>().is_err());
    }
}
