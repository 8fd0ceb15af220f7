//! Q-Chem output file parsing.
//!
//! This module extracts calculation results from Q-Chem output files
//! (`mol.qout`). Only the quantities the workflow consumes are parsed:
//!
//! - Final total energy, from `Total energy in the final basis set = <E>`
//!   (Hartree)
//! - Cartesian energy gradient, from the `Gradient of SCF Energy` block
//!   (Hartree/Bohr)
//! - SCF convergence status
//!
//! # Gradient Block Layout
//!
//! Q-Chem prints the gradient transposed, in batches of up to six atoms: a
//! header row of atom indices, then one row per Cartesian component labeled
//! 1 (x), 2 (y), and 3 (z):
//!
//! ```text
//!  Gradient of SCF Energy
//!             1           2           3           4           5           6
//!    1   0.0268877  -0.0043219   0.0102240  -0.0008761   0.0110293  -0.0060624
//!    2  -0.0048061   0.0074011  -0.0088208   0.0118484  -0.0011440  -0.0066911
//!    3   0.0034625   0.0033884  -0.0117168   0.0046189   0.0090064  -0.0031875
//!             7           8
//!    1   0.0022099  -0.0071960
//!    ...
//! ```
//!
//! The parser reassembles the per-atom `[x, y, z]` layout used everywhere
//! else in the crate.

use lazy_static::lazy_static;
use nalgebra::DVector;
use regex::Regex;
use thiserror::Error;

/// Error type for output parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Required quantity missing from the output
    #[error("Parse error: {0}")]
    Missing(String),
    /// Malformed output content
    #[error("Parse error: {0}")]
    Malformed(String),
}

type Result<T> = std::result::Result<T, ParseError>;

lazy_static! {
    static ref FLOAT_RE: String = r"[-+]?(?:\d+\.\d*|\.\d+)(?:[eE][-+]?\d+)?".to_string();

    // " Total energy in the final basis set =     -606.1616819641"
    static ref FINAL_ENERGY_RE: Regex = Regex::new(&format!(
        r"Total energy in the final basis set\s*=\s*({0})",
        *FLOAT_RE
    ))
    .unwrap();

    // Gradient component row: "    1   0.0268877  -0.0043219 ..."
    static ref GRAD_ROW_RE: Regex =
        Regex::new(&format!(r"^\s*([123])((?:\s+{0})+)\s*$", *FLOAT_RE)).unwrap();

    // Atom index header row: "            1           2           3"
    static ref INDEX_ROW_RE: Regex = Regex::new(r"^\s*\d+(?:\s+\d+)*\s*$").unwrap();
}

/// Parsed results from a Q-Chem output file.
#[derive(Debug, Clone)]
pub struct QcOutput {
    /// Final total energy in Hartree
    pub final_energy: f64,
    /// Cartesian energy gradient, flat [x1, y1, z1, ...] in Hartree/Bohr
    pub gradient: DVector<f64>,
    /// Whether the SCF reported convergence
    pub scf_converged: bool,
}

impl QcOutput {
    /// Number of atoms implied by the gradient length.
    pub fn num_atoms(&self) -> usize {
        self.gradient.len() / 3
    }
}

/// Parse a Q-Chem output file's content.
///
/// Returns an error when the final energy or the gradient block is absent or
/// inconsistent. SCF convergence failure is reported through the
/// `scf_converged` flag rather than an error, so callers can decide whether
/// an unconverged result is fatal.
pub fn parse_qchem_output(content: &str) -> Result<QcOutput> {
    let mut energy: Option<f64> = None;
    let mut converged = false;
    let mut failed = false;

    // gradient[atom][component], assembled across batches
    let mut columns: Vec<usize> = Vec::new();
    let mut gradient: Vec<[f64; 3]> = Vec::new();
    let mut in_gradient = false;
    let mut rows_seen = 0u8;

    for line in content.lines() {
        if let Some(caps) = FINAL_ENERGY_RE.captures(line) {
            // Multi-step outputs repeat the banner; keep the last energy.
            energy = caps[1].parse().ok();
        } else if line.contains("Convergence criterion met") {
            converged = true;
        } else if line.contains("SCF failed to converge") {
            failed = true;
        }

        if line.contains("Gradient of SCF Energy") {
            in_gradient = true;
            columns.clear();
            gradient.clear();
            rows_seen = 0;
            continue;
        }

        if !in_gradient {
            continue;
        }

        if let Some(caps) = GRAD_ROW_RE.captures(line) {
            let component: usize = caps[1]
                .parse::<usize>()
                .map_err(|_| ParseError::Malformed("bad gradient row label".to_string()))?
                - 1;
            let values: Vec<f64> = caps[2]
                .split_whitespace()
                .map(|v| {
                    v.parse::<f64>()
                        .map_err(|_| ParseError::Malformed(format!("bad gradient value: {}", v)))
                })
                .collect::<Result<_>>()?;
            if values.len() != columns.len() {
                return Err(ParseError::Malformed(format!(
                    "gradient row has {} values for {} atoms",
                    values.len(),
                    columns.len()
                )));
            }
            for (col, value) in columns.iter().zip(values) {
                gradient[*col][component] = value;
            }
            rows_seen += 1;
        } else if INDEX_ROW_RE.is_match(line) {
            if rows_seen != 0 && rows_seen != 3 {
                return Err(ParseError::Malformed(
                    "incomplete gradient batch before new atom indices".to_string(),
                ));
            }
            rows_seen = 0;
            columns = line
                .split_whitespace()
                .map(|v| {
                    v.parse::<usize>()
                        .map_err(|_| ParseError::Malformed(format!("bad atom index: {}", v)))
                })
                .collect::<Result<_>>()?;
            for &col in &columns {
                if col == 0 {
                    return Err(ParseError::Malformed("atom indices are 1-based".to_string()));
                }
                while gradient.len() < col {
                    gradient.push([0.0; 3]);
                }
            }
            // Columns are 1-based in the file.
            columns.iter_mut().for_each(|c| *c -= 1);
        } else {
            // Any other line terminates the block.
            in_gradient = false;
        }
    }

    let energy = energy
        .ok_or_else(|| ParseError::Missing("no final energy found in output".to_string()))?;
    if gradient.is_empty() {
        return Err(ParseError::Missing("no gradient block found in output".to_string()));
    }

    let flat: Vec<f64> = gradient.iter().flat_map(|g| g.iter().copied()).collect();

    Ok(QcOutput {
        final_energy: energy,
        gradient: DVector::from_vec(flat),
        scf_converged: converged && !failed,
    })
}
