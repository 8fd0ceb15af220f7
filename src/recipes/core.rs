//! Single-point and relaxation jobs.

use super::{resolve_params, summarize, JobParams, JobSummary};
use crate::geometry::Geometry;
use crate::optimizer::{self, OptParams, StepMode};
use crate::qm_interface::{Execute, QChemCalculator, Result};
use crate::settings::Settings;
use log::info;

/// Single-point (static) calculation.
///
/// Evaluates energy and forces at the given structure and returns it
/// unchanged in the summary. The Q-Chem input that ran is left in the
/// working directory as `mol.qin.gz`.
pub fn static_job(
    geometry: &Geometry,
    params: JobParams,
    settings: &Settings,
    executor: &dyn Execute,
) -> Result<JobSummary> {
    let calc_params = resolve_params(geometry, &params, settings)?;
    let workdir = settings.resolved_workdir().map_err(std::io::Error::other)?;
    let calc = QChemCalculator::new(calc_params.clone(), settings, &workdir, executor);

    info!(
        "static job: {} ({} atoms)",
        geometry.formula_alphabetical(),
        geometry.num_atoms
    );
    let results = calc.run(geometry)?;

    Ok(summarize(geometry.clone(), &calc_params, params, results))
}

/// Geometry relaxation (minimization).
///
/// Drives the optimizer selected in `opt` until the force threshold or step
/// limit is reached. The returned structure is the optimizer's final
/// geometry.
pub fn relax_job(
    geometry: &Geometry,
    params: JobParams,
    opt: OptParams,
    settings: &Settings,
    executor: &dyn Execute,
) -> Result<JobSummary> {
    let calc_params = resolve_params(geometry, &params, settings)?;
    let workdir = settings.resolved_workdir().map_err(std::io::Error::other)?;
    let calc = QChemCalculator::new(calc_params.clone(), settings, &workdir, executor);

    info!(
        "relax job: {} ({} atoms, max {} steps)",
        geometry.formula_alphabetical(),
        geometry.num_atoms,
        opt.max_steps
    );
    let outcome = optimizer::drive(&calc, geometry, &opt, StepMode::Minimize)?;

    Ok(summarize(
        outcome.geometry,
        &calc_params,
        params,
        outcome.results,
    ))
}
