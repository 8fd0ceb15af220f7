#![deny(missing_docs)]

//! qcflow - Computational Chemistry Workflow Recipes for Q-Chem
//!
//! qcflow provides "recipe" functions that drive the Q-Chem quantum chemistry
//! package through a calculator abstraction: each recipe assembles an input
//! file from keyword parameters, hands it to the external `qchem` executable,
//! parses the output, and returns a normalized result record.
//!
//! # Overview
//!
//! The library is organized around three layers:
//!
//! 1. **Calculator** ([`qm_interface`]): writes a Q-Chem input file for a
//!    geometry, invokes the external program through the [`Execute`] seam,
//!    and parses energy and forces from the output. The executor seam is a
//!    trait so that test suites can replay pre-recorded outputs instead of
//!    running Q-Chem.
//!
//! 2. **Optimizer** ([`optimizer`]): a small geometry-optimization driver
//!    that repeatedly evaluates the calculator and steps the geometry. It
//!    supports quasi-Newton minimization (BFGS updates), saddle-point
//!    search (Bofill updates), FIRE relaxation, and reaction-path (IRC)
//!    following.
//!
//! 3. **Recipes** ([`recipes`]): the user-facing job functions
//!    ([`static_job`](recipes::core::static_job),
//!    [`relax_job`](recipes::core::relax_job),
//!    [`ts_job`](recipes::ts::ts_job),
//!    [`irc_job`](recipes::ts::irc_job),
//!    [`quasi_irc_job`](recipes::ts::quasi_irc_job)) that wire parameters,
//!    calculator, and optimizer together and return a [`JobSummary`]
//!    (structure, charge, spin multiplicity, formula, electron count, the
//!    full parameter set, and calculation results).
//!
//! # Quick Start
//!
//! ```no_run
//! use qcflow::qm_interface::QChemExecutor;
//! use qcflow::recipes::core::static_job;
//! use qcflow::recipes::JobParams;
//! use qcflow::settings::Settings;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let geometry = qcflow::io::read_xyz(Path::new("mol.xyz"))?;
//!     let settings = Settings::default();
//!     let executor = QChemExecutor::from_settings(&settings);
//!
//!     let summary = static_job(&geometry, JobParams::default(), &settings, &executor)?;
//!     println!("E = {:.10} Ha", summary.results.energy);
//!     Ok(())
//! }
//! ```
//!
//! # Input Files
//!
//! Every job writes the Q-Chem input it ran to the working directory as
//! `mol.qin.gz`. The file uses the standard section format:
//!
//! ```text
//! $molecule
//!  0 1
//!  C       0.0000000000     0.0000000000     0.0000000000
//! $end
//!
//! $rem
//!    basis = def2-tzvpd
//!    job_type = force
//!    method = wb97xv
//! $end
//! ```
//!
//! Solvation is requested through either a PCM dielectric constant or an SMD
//! solvent name. The two models are mutually exclusive; requesting both is a
//! validation error raised before any external process is invoked.
//!
//! # Units
//!
//! Coordinates are in Angstrom. Energies are in Hartree and forces in
//! Hartree/Bohr, as parsed from the Q-Chem output.
//!
//! # Modules
//!
//! - [`geometry`] - Molecular structure, formula, and electron counting
//! - [`qcinput`] - Q-Chem input file model (write, parse, compare)
//! - [`parser`] - Q-Chem output file parsing
//! - [`qm_interface`] - Calculator and executor seam
//! - [`optimizer`] - Geometry optimization drivers
//! - [`recipes`] - Job functions and the result schema
//! - [`validation`] - Parameter validation
//! - [`settings`] - Configuration management
//! - [`io`] - File I/O utilities (XYZ, gzip)
//!
//! [`Execute`]: qm_interface::Execute
//! [`JobSummary`]: recipes::JobSummary

pub mod geometry;
pub mod io;
pub mod optimizer;
pub mod parser;
pub mod qcinput;
pub mod qm_interface;
pub mod recipes;
/// Configuration management system
pub mod settings;
/// Parameter validation for job functions
pub mod validation;

pub use geometry::Geometry;
pub use recipes::{JobParams, JobSummary};
