//! Q-Chem calculator interface.
//!
//! This module owns the lifecycle of a single Q-Chem evaluation: assemble an
//! input file for a geometry, execute the external program, and parse energy
//! and forces from the output.
//!
//! # Executor Seam
//!
//! Execution is abstracted behind the [`Execute`] trait. The production
//! implementation, [`QChemExecutor`], shells out to the configured `qchem`
//! command. Test suites substitute an implementation that copies
//! pre-recorded output fixtures into the working directory, so the full
//! input-assembly and output-parsing path runs without the external engine.
//!
//! # Working Directory Convention
//!
//! Each run writes `mol.qin` into the working directory, executes, parses
//! `mol.qout`, and (by default) compresses the input to `mol.qin.gz`. The
//! gzipped input is the durable record of what was actually run.

use crate::geometry::Geometry;
use crate::io;
use crate::parser::{self, ParseError};
use crate::qcinput::{MoleculeBlock, QcInput, QcInputError};
use crate::settings::Settings;
use crate::validation::ValidationError;
use log::debug;
use nalgebra::DVector;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Input file name written before each execution.
pub const INPUT_FILE: &str = "mol.qin";
/// Output file name expected after each execution.
pub const OUTPUT_FILE: &str = "mol.qout";

/// Error type for calculator operations.
///
/// Calculations can fail at four stages: parameter validation, file I/O,
/// program execution, and output parsing.
#[derive(Error, Debug)]
pub enum QcError {
    /// File system or I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Q-Chem program execution failed
    #[error("Q-Chem execution failed: {0}")]
    Calculation(String),
    /// Failed to parse program output
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Input file construction or parsing failed
    #[error(transparent)]
    Input(#[from] QcInputError),
    /// Job parameters failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    /// The calculation did not produce converged results
    #[error("Unconverged results: {0}")]
    Unconverged(String),
}

/// Type alias for calculator operation results
pub type Result<T> = std::result::Result<T, QcError>;

/// Energy and forces from a single evaluation.
#[derive(Debug, Clone)]
pub struct CalcResults {
    /// Total energy in Hartree
    pub energy: f64,
    /// Forces (negative gradient), flat [x1, y1, z1, ...] in Hartree/Bohr
    pub forces: DVector<f64>,
}

/// Executes a prepared calculation in a working directory.
///
/// Implementors consume the `mol.qin` already present in `workdir` and must
/// leave a `mol.qout` behind. This is the seam test suites mock to replay
/// recorded outputs.
pub trait Execute {
    /// Run the calculation in `workdir`.
    fn execute(&self, workdir: &Path) -> Result<()>;
}

/// Production executor that invokes the external `qchem` command.
pub struct QChemExecutor {
    /// Q-Chem command to execute
    pub cmd: String,
    /// Number of threads passed via `-nt`
    pub nprocs: u32,
}

impl QChemExecutor {
    /// Build an executor from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cmd: settings.qchem.cmd.clone(),
            nprocs: settings.qchem.nprocs,
        }
    }
}

impl Execute for QChemExecutor {
    fn execute(&self, workdir: &Path) -> Result<()> {
        let output = Command::new(&self.cmd)
            .arg("-nt")
            .arg(self.nprocs.to_string())
            .arg(INPUT_FILE)
            .arg(OUTPUT_FILE)
            .current_dir(workdir)
            .output()?;

        if !output.status.success() {
            return Err(QcError::Calculation(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolved chemistry parameters for input assembly.
///
/// Unlike [`JobParams`](crate::recipes::JobParams), all optional fields here
/// have been resolved: charge and multiplicity are concrete, and solvation
/// has been validated as at most one model.
#[derive(Debug, Clone)]
pub struct CalcParams {
    /// Total molecular charge
    pub charge: i32,
    /// Spin multiplicity (2S + 1)
    pub spin_multiplicity: u32,
    /// Exchange-correlation method
    pub method: String,
    /// Basis set
    pub basis: String,
    /// SCF convergence algorithm
    pub scf_algorithm: String,
    /// PCM dielectric constant, when PCM solvation is requested
    pub pcm_dielectric: Option<f64>,
    /// SMD solvent name, when SMD solvation is requested
    pub smd_solvent: Option<String>,
    /// Raw section overrides applied after assembly
    pub overwrite_inputs: BTreeMap<String, BTreeMap<String, String>>,
    /// SCF cycle cap written into `$rem`
    pub max_scf_cycles: u32,
}

impl CalcParams {
    /// Assemble the complete Q-Chem input for a geometry.
    ///
    /// The base `$rem` block requests a force (gradient) job with symmetry
    /// disabled so orientations match between steps. Solvation adds the
    /// matching `solvent_method` plus its section; raw overrides are applied
    /// last and may replace any assembled keyword.
    pub fn build_input(&self, geometry: &Geometry) -> Result<QcInput> {
        let mut input = QcInput::new(MoleculeBlock {
            charge: self.charge,
            spin_multiplicity: self.spin_multiplicity,
            geometry: geometry.clone(),
        });

        input.set_rem("job_type", "force");
        input.set_rem("method", &self.method);
        input.set_rem("basis", &self.basis);
        input.set_rem("scf_algorithm", &self.scf_algorithm);
        input.set_rem("max_scf_cycles", self.max_scf_cycles.to_string());
        input.set_rem("gen_scfman", "true");
        input.set_rem("xc_grid", "3");
        input.set_rem("symmetry", "false");
        input.set_rem("sym_ignore", "true");

        if let Some(dielectric) = self.pcm_dielectric {
            input.set_rem("solvent_method", "pcm");
            for (k, v) in [
                ("heavypoints", "194"),
                ("hpoints", "194"),
                ("radii", "uff"),
                ("theory", "cpcm"),
                ("vdwscale", "1.1"),
            ] {
                input.pcm.insert(k.to_string(), v.to_string());
            }
            input
                .solvent
                .insert("dielectric".to_string(), dielectric.to_string());
        } else if let Some(solvent) = &self.smd_solvent {
            input.set_rem("solvent_method", "smd");
            input.smx.insert("solvent".to_string(), solvent.clone());
        }

        input.apply_overrides(&self.overwrite_inputs)?;
        Ok(input)
    }
}

/// Calculator that drives Q-Chem for one parameter set.
///
/// A calculator is bound to a working directory and an executor; `run`
/// evaluates any geometry under the stored parameters. Optimization drivers
/// call `run` repeatedly as the geometry changes.
pub struct QChemCalculator<'a> {
    params: CalcParams,
    workdir: PathBuf,
    executor: &'a dyn Execute,
    gzip_inputs: bool,
    check_convergence: bool,
}

impl<'a> QChemCalculator<'a> {
    /// Create a calculator in `workdir` using the given executor.
    pub fn new(
        params: CalcParams,
        settings: &Settings,
        workdir: &Path,
        executor: &'a dyn Execute,
    ) -> Self {
        Self {
            params,
            workdir: workdir.to_path_buf(),
            executor,
            gzip_inputs: settings.runtime.gzip_inputs,
            check_convergence: settings.runtime.check_convergence,
        }
    }

    /// The working directory this calculator runs in.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The resolved parameters this calculator was built with.
    pub fn params(&self) -> &CalcParams {
        &self.params
    }

    /// Evaluate energy and forces for a geometry.
    ///
    /// Writes `mol.qin`, executes, parses `mol.qout`, and compresses the
    /// input to `mol.qin.gz` when gzipping is enabled. When the convergence
    /// guard is active, an SCF that did not converge is an error.
    pub fn run(&self, geometry: &Geometry) -> Result<CalcResults> {
        let input = self.params.build_input(geometry)?;
        let input_path = self.workdir.join(INPUT_FILE);
        input.write(&input_path)?;
        debug!(
            "wrote {} ({} atoms, charge {}, multiplicity {})",
            input_path.display(),
            geometry.num_atoms,
            self.params.charge,
            self.params.spin_multiplicity
        );

        self.executor.execute(&self.workdir)?;

        let content = io::read_to_string_auto(&self.workdir.join(OUTPUT_FILE))?;
        let output = parser::parse_qchem_output(&content)?;
        if self.check_convergence && !output.scf_converged {
            return Err(QcError::Unconverged(
                "SCF failed to converge; inspect mol.qout".to_string(),
            ));
        }
        if output.num_atoms() != geometry.num_atoms {
            return Err(QcError::Calculation(format!(
                "output holds {} atoms but the input had {}",
                output.num_atoms(),
                geometry.num_atoms
            )));
        }

        if self.gzip_inputs {
            io::write_gzip(&self.workdir.join("mol.qin.gz"), &input.to_string())?;
            std::fs::remove_file(&input_path)?;
        }

        Ok(CalcResults {
            energy: output.final_energy,
            forces: -output.gradient,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> CalcParams {
        CalcParams {
            charge: 0,
            spin_multiplicity: 1,
            method: "wb97xv".to_string(),
            basis: "def2-tzvpd".to_string(),
            scf_algorithm: "diis".to_string(),
            pcm_dielectric: None,
            smd_solvent: None,
            overwrite_inputs: BTreeMap::new(),
            max_scf_cycles: 200,
        }
    }

    fn h2() -> Geometry {
        Geometry::new(
            vec!["H".to_string(), "H".to_string()],
            vec![0.0, 0.0, 0.0, 0.74, 0.0, 0.0],
        )
    }

    #[test]
    fn test_build_input_gas_phase() {
        let input = base_params().build_input(&h2()).unwrap();
        assert_eq!(input.rem.get("job_type").unwrap(), "force");
        assert_eq!(input.rem.get("method").unwrap(), "wb97xv");
        assert!(input.rem.get("solvent_method").is_none());
        assert!(input.pcm.is_empty());
        assert!(input.smx.is_empty());
    }

    #[test]
    fn test_build_input_pcm() {
        let mut params = base_params();
        params.pcm_dielectric = Some(78.39);
        let input = params.build_input(&h2()).unwrap();
        assert_eq!(input.rem.get("solvent_method").unwrap(), "pcm");
        assert_eq!(input.pcm.get("theory").unwrap(), "cpcm");
        assert_eq!(input.solvent.get("dielectric").unwrap(), "78.39");
    }

    #[test]
    fn test_build_input_smd() {
        let mut params = base_params();
        params.smd_solvent = Some("water".to_string());
        let input = params.build_input(&h2()).unwrap();
        assert_eq!(input.rem.get("solvent_method").unwrap(), "smd");
        assert_eq!(input.smx.get("solvent").unwrap(), "water");
        assert!(input.pcm.is_empty());
    }

    #[test]
    fn test_overrides_reach_rem() {
        let mut params = base_params();
        let mut rem = BTreeMap::new();
        rem.insert("mem_total".to_string(), "170000".to_string());
        params
            .overwrite_inputs
            .insert("rem".to_string(), rem);
        let input = params.build_input(&h2()).unwrap();
        assert_eq!(input.rem.get("mem_total").unwrap(), "170000");
    }
}
