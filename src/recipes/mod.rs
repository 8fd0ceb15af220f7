//! Job functions ("recipes") and the result schema.
//!
//! A recipe assembles calculator configuration from keyword parameters,
//! validates it, delegates execution to the external Q-Chem program through
//! the calculator abstraction, and normalizes results into a [`JobSummary`].
//!
//! - [`core`]: single-point ([`static_job`](core::static_job)) and
//!   relaxation ([`relax_job`](core::relax_job)) jobs
//! - [`ts`]: transition-state ([`ts_job`](ts::ts_job)), IRC
//!   ([`irc_job`](ts::irc_job)), and quasi-IRC
//!   ([`quasi_irc_job`](ts::quasi_irc_job)) jobs
//!
//! All parameter validation happens before anything touches the filesystem
//! or the executor. Every job leaves `mol.qin.gz` in the working directory
//! as the record of the (last) calculation it ran.

pub mod core;
pub mod ts;

use crate::geometry::Geometry;
use crate::qm_interface::{CalcParams, CalcResults, Result};
use crate::settings::Settings;
use crate::validation::{check_charge_and_spin, check_solvent_models};
use std::collections::BTreeMap;

/// User-facing chemistry parameters for a job.
///
/// Optional fields are resolved at job time: a missing charge means neutral,
/// and a missing spin multiplicity is inferred from electron parity. The
/// unresolved values are preserved verbatim in the
/// [`JobSummary::parameters`] record.
#[derive(Debug, Clone, PartialEq)]
pub struct JobParams {
    /// Total molecular charge; `None` means 0
    pub charge: Option<i32>,
    /// Spin multiplicity; `None` means lowest value allowed by parity
    pub spin_multiplicity: Option<u32>,
    /// Exchange-correlation method
    pub method: String,
    /// Basis set
    pub basis: String,
    /// SCF convergence algorithm
    pub scf_algorithm: String,
    /// PCM dielectric constant; mutually exclusive with `smd_solvent`
    pub pcm_dielectric: Option<f64>,
    /// SMD solvent name; mutually exclusive with `pcm_dielectric`
    pub smd_solvent: Option<String>,
    /// Raw input-section overrides, section -> key -> value
    pub overwrite_inputs: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            charge: None,
            spin_multiplicity: None,
            method: "wb97xv".to_string(),
            basis: "def2-tzvpd".to_string(),
            scf_algorithm: "diis".to_string(),
            pcm_dielectric: None,
            smd_solvent: None,
            overwrite_inputs: BTreeMap::new(),
        }
    }
}

/// Normalized result record returned by every job function.
#[derive(Debug, Clone)]
pub struct JobSummary {
    /// Final structure (input structure for single-point jobs)
    pub geometry: Geometry,
    /// Resolved molecular charge
    pub charge: i32,
    /// Resolved spin multiplicity
    pub spin_multiplicity: u32,
    /// Alphabetical formula, e.g. "C4 H4 O6"
    pub formula_alphabetical: String,
    /// Electron count at the resolved charge
    pub nelectrons: usize,
    /// The parameters the job was invoked with, unresolved options intact
    pub parameters: JobParams,
    /// Energy and forces from the (final) evaluation
    pub results: CalcResults,
}

/// Validate job parameters against a geometry and resolve them for the
/// calculator.
///
/// Checks solvation-model exclusivity and charge/spin consistency; nothing
/// is written and no process is spawned before this succeeds.
pub(crate) fn resolve_params(
    geometry: &Geometry,
    params: &JobParams,
    settings: &Settings,
) -> Result<CalcParams> {
    check_solvent_models(params.pcm_dielectric, params.smd_solvent.as_deref())?;
    let (charge, spin_multiplicity) =
        check_charge_and_spin(geometry, params.charge, params.spin_multiplicity)?;

    Ok(CalcParams {
        charge,
        spin_multiplicity,
        method: params.method.clone(),
        basis: params.basis.clone(),
        scf_algorithm: params.scf_algorithm.clone(),
        pcm_dielectric: params.pcm_dielectric,
        smd_solvent: params.smd_solvent.clone(),
        overwrite_inputs: params.overwrite_inputs.clone(),
        max_scf_cycles: settings.qchem.max_scf_cycles,
    })
}

/// Assemble the result record for a finished job.
pub(crate) fn summarize(
    final_geometry: Geometry,
    calc_params: &CalcParams,
    parameters: JobParams,
    results: CalcResults,
) -> JobSummary {
    let formula_alphabetical = final_geometry.formula_alphabetical();
    let nelectrons = final_geometry.electron_count(calc_params.charge);
    JobSummary {
        geometry: final_geometry,
        charge: calc_params.charge,
        spin_multiplicity: calc_params.spin_multiplicity,
        formula_alphabetical,
        nelectrons,
        parameters,
        results,
    }
}
