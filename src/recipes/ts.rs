//! Transition-state and reaction-path jobs.

use super::{resolve_params, summarize, JobParams, JobSummary};
use crate::geometry::Geometry;
use crate::optimizer::{self, OptParams, StepMode};
use crate::qm_interface::{Execute, QChemCalculator, Result};
use crate::settings::Settings;
use crate::validation::{require_saddle_capable, IrcDirection};
use log::info;

/// Step cap for saddle searches; TS steps are kept short so the walker does
/// not fall off the saddle region.
const TS_MAX_STEP: f64 = 0.05;

/// Default number of IRC steps in a quasi-IRC job.
const QUASI_IRC_STEPS: usize = 10;

/// Transition-state (first-order saddle point) search.
///
/// Only the quasi-Newton optimizer can walk to a saddle; selecting FIRE is a
/// validation error.
pub fn ts_job(
    geometry: &Geometry,
    params: JobParams,
    mut opt: OptParams,
    settings: &Settings,
    executor: &dyn Execute,
) -> Result<JobSummary> {
    require_saddle_capable(opt.optimizer)?;
    let calc_params = resolve_params(geometry, &params, settings)?;
    let workdir = settings.resolved_workdir().map_err(std::io::Error::other)?;
    let calc = QChemCalculator::new(calc_params.clone(), settings, &workdir, executor);

    opt.max_step_size = opt.max_step_size.min(TS_MAX_STEP);
    info!(
        "ts job: {} ({} atoms, max {} steps)",
        geometry.formula_alphabetical(),
        geometry.num_atoms,
        opt.max_steps
    );
    let outcome = optimizer::drive(&calc, geometry, &opt, StepMode::SaddlePoint)?;

    Ok(summarize(
        outcome.geometry,
        &calc_params,
        params,
        outcome.results,
    ))
}

/// Intrinsic reaction coordinate following.
///
/// `direction` must be `"forward"` or `"reverse"`; anything else is a
/// validation error, raised before any external process is invoked.
pub fn irc_job(
    geometry: &Geometry,
    direction: &str,
    params: JobParams,
    opt: OptParams,
    settings: &Settings,
    executor: &dyn Execute,
) -> Result<JobSummary> {
    let direction: IrcDirection = direction.parse()?;
    require_saddle_capable(opt.optimizer)?;
    let calc_params = resolve_params(geometry, &params, settings)?;
    let workdir = settings.resolved_workdir().map_err(std::io::Error::other)?;
    let calc = QChemCalculator::new(calc_params.clone(), settings, &workdir, executor);

    info!(
        "irc job ({:?}): {} ({} atoms, max {} steps)",
        direction,
        geometry.formula_alphabetical(),
        geometry.num_atoms,
        opt.max_steps
    );
    let outcome = optimizer::drive_irc(&calc, geometry, &opt, direction)?;

    Ok(summarize(
        outcome.geometry,
        &calc_params,
        params,
        outcome.results,
    ))
}

/// Quasi-IRC: a short IRC segment followed by a relaxation of the endpoint.
///
/// `shared_params` configures both phases. The IRC phase defaults to ten
/// steps; both phases accept optimizer overrides. The summary reflects the
/// relaxed endpoint.
pub fn quasi_irc_job(
    geometry: &Geometry,
    direction: &str,
    shared_params: JobParams,
    irc_opt: Option<OptParams>,
    relax_opt: Option<OptParams>,
    settings: &Settings,
    executor: &dyn Execute,
) -> Result<JobSummary> {
    let direction: IrcDirection = direction.parse()?;
    let irc_opt = irc_opt.unwrap_or(OptParams {
        max_steps: QUASI_IRC_STEPS,
        ..OptParams::default()
    });
    let relax_opt = relax_opt.unwrap_or_default();
    require_saddle_capable(irc_opt.optimizer)?;
    let calc_params = resolve_params(geometry, &shared_params, settings)?;
    let workdir = settings.resolved_workdir().map_err(std::io::Error::other)?;
    let calc = QChemCalculator::new(calc_params.clone(), settings, &workdir, executor);

    info!(
        "quasi-irc job ({:?}): {} + relax",
        direction,
        geometry.formula_alphabetical()
    );
    let irc_outcome = optimizer::drive_irc(&calc, geometry, &irc_opt, direction)?;
    let relax_outcome =
        optimizer::drive(&calc, &irc_outcome.geometry, &relax_opt, StepMode::Minimize)?;

    Ok(summarize(
        relax_outcome.geometry,
        &calc_params,
        shared_params,
        relax_outcome.results,
    ))
}
