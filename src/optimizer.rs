//! Geometry optimization drivers.
//!
//! This module drives the calculator through geometry updates. Three drivers
//! are provided:
//!
//! - a quasi-Newton driver with BFGS Hessian updates for minimization and
//!   Bofill updates for saddle-point search,
//! - FIRE (fast inertial relaxation engine) for plain minimization,
//! - an IRC driver that displaces along the reaction mode and then walks
//!   downhill.
//!
//! The drivers are deliberately small: they exist to move the structure
//! between calculator evaluations, not to replace a production optimizer.
//! Gradients arrive in Hartree/Bohr and are converted to Hartree/Angstrom
//! before stepping, since coordinates are kept in Angstrom.
//!
//! `max_steps = n` means n steps are taken after the initial evaluation, so
//! the last input file written by the calculator corresponds to the final
//! geometry.

use crate::geometry::{Geometry, ANGSTROM_TO_BOHR};
use crate::qm_interface::{CalcResults, QChemCalculator, Result};
use crate::validation::IrcDirection;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};

const UPDATE_EPS: f64 = 1e-12;

/// Optimizer selection for relaxation jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizerKind {
    /// Quasi-Newton with BFGS/Bofill Hessian updates (default)
    #[default]
    QuasiNewton,
    /// FIRE velocity-damping minimizer
    Fire,
}

/// What kind of stationary point the quasi-Newton driver walks toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Minimize the energy (BFGS updates)
    Minimize,
    /// Walk to a first-order saddle point (Bofill updates)
    SaddlePoint,
}

/// Optimization parameters; the recipe-level `opt_swaps`.
#[derive(Debug, Clone)]
pub struct OptParams {
    /// Optimizer to use
    pub optimizer: OptimizerKind,
    /// Convergence threshold on the largest force component (Hartree/Bohr)
    pub fmax: f64,
    /// Maximum number of steps
    pub max_steps: usize,
    /// Step norm cap in Angstrom
    pub max_step_size: f64,
}

impl Default for OptParams {
    fn default() -> Self {
        Self {
            optimizer: OptimizerKind::QuasiNewton,
            fmax: 0.01,
            max_steps: 500,
            max_step_size: 0.1,
        }
    }
}

/// Outcome of an optimization run.
#[derive(Debug, Clone)]
pub struct OptOutcome {
    /// Final geometry
    pub geometry: Geometry,
    /// Results at the final geometry
    pub results: CalcResults,
    /// Whether the force threshold was met
    pub converged: bool,
    /// Number of steps actually taken
    pub steps_taken: usize,
}

/// Largest absolute force component in Hartree/Bohr.
pub fn max_force(forces: &DVector<f64>) -> f64 {
    forces.iter().fold(0.0_f64, |acc, f| acc.max(f.abs()))
}

/// Gradient in Hartree/Angstrom from forces in Hartree/Bohr.
fn gradient_angstrom(forces: &DVector<f64>) -> DVector<f64> {
    -forces * ANGSTROM_TO_BOHR
}

fn clamp_step(mut step: DVector<f64>, max_step_size: f64) -> DVector<f64> {
    let norm = step.norm();
    if norm > max_step_size {
        step *= max_step_size / norm;
    }
    step
}

/// Relax a geometry with the optimizer selected in `params`.
pub fn drive(
    calc: &QChemCalculator,
    geometry: &Geometry,
    params: &OptParams,
    mode: StepMode,
) -> Result<OptOutcome> {
    match (params.optimizer, mode) {
        (OptimizerKind::Fire, StepMode::Minimize) => drive_fire(calc, geometry, params),
        _ => drive_quasi_newton(calc, geometry, params, mode),
    }
}

/// Quasi-Newton driver with identity-initialized Hessian.
///
/// The Hessian starts as the identity (Hartree/Angstrom^2) and is refined
/// from gradient differences: BFGS for minimization, Bofill for saddle
/// search. Updates are skipped when the gradient change is degenerate, which
/// keeps the driver stable when consecutive evaluations coincide.
fn drive_quasi_newton(
    calc: &QChemCalculator,
    geometry: &Geometry,
    params: &OptParams,
    mode: StepMode,
) -> Result<OptOutcome> {
    let mut geom = geometry.clone();
    let mut results = calc.run(&geom)?;
    let n = geom.coords.len();
    let mut hessian = DMatrix::<f64>::identity(n, n);
    let mut previous: Option<(DVector<f64>, DVector<f64>)> = None;
    let mut steps_taken = 0;

    while steps_taken < params.max_steps && max_force(&results.forces) > params.fmax {
        let grad = gradient_angstrom(&results.forces);

        if let Some((x_prev, g_prev)) = &previous {
            let s = &geom.coords - x_prev;
            let y = &grad - g_prev;
            match mode {
                StepMode::Minimize => bfgs_update(&mut hessian, &s, &y),
                StepMode::SaddlePoint => bofill_update(&mut hessian, &s, &y),
            }
        }
        previous = Some((geom.coords.clone(), grad.clone()));

        let neg_g = -&grad;
        let step = hessian
            .clone()
            .lu()
            .solve(&neg_g)
            .unwrap_or_else(|| neg_g.clone());
        let step = clamp_step(step, params.max_step_size);

        geom = geom.displaced(&step);
        steps_taken += 1;
        debug!(
            "quasi-Newton step {}: |dx| = {:.6} A, fmax = {:.6} Ha/Bohr",
            steps_taken,
            step.norm(),
            max_force(&results.forces)
        );

        results = calc.run(&geom)?;
    }

    let converged = max_force(&results.forces) <= params.fmax;
    info!(
        "quasi-Newton finished after {} steps (converged: {})",
        steps_taken, converged
    );
    Ok(OptOutcome {
        geometry: geom,
        results,
        converged,
        steps_taken,
    })
}

/// BFGS update toward a positive-definite Hessian.
fn bfgs_update(hessian: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
    if y.norm_squared() < UPDATE_EPS {
        return;
    }
    let sy = s.dot(y);
    let hs = &*hessian * s;
    let shs = s.dot(&hs);
    if sy.abs() < UPDATE_EPS || shs.abs() < UPDATE_EPS {
        return;
    }
    *hessian += y * y.transpose() / sy - &hs * hs.transpose() / shs;
}

/// Bofill update, the standard choice for saddle-point searches.
///
/// Blends the symmetric rank-one and Powell-symmetric-Broyden formulas with
/// the Bofill weight `phi = (s.e)^2 / (|s|^2 |e|^2)` where `e = y - H s`.
fn bofill_update(hessian: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) {
    if y.norm_squared() < UPDATE_EPS {
        return;
    }
    let e = y - &*hessian * s;
    let ss = s.norm_squared();
    let ee = e.norm_squared();
    let se = s.dot(&e);
    if ss < UPDATE_EPS || ee < UPDATE_EPS {
        return;
    }
    let phi = se * se / (ss * ee);

    if se.abs() >= UPDATE_EPS {
        *hessian += phi * (&e * e.transpose() / se);
    }
    let psb = (&e * s.transpose() + s * e.transpose()) / ss - se * (s * s.transpose()) / (ss * ss);
    *hessian += (1.0 - phi) * psb;
}

/// FIRE minimizer (Bitzek et al., Phys. Rev. Lett. 2006).
///
/// Standard parameter set: dt grows by 1.1 after five aligned steps, shrinks
/// by 0.5 on uphill motion, mixing starts at 0.1.
fn drive_fire(
    calc: &QChemCalculator,
    geometry: &Geometry,
    params: &OptParams,
) -> Result<OptOutcome> {
    const DT_START: f64 = 0.1;
    const DT_MAX: f64 = 1.0;
    const F_INC: f64 = 1.1;
    const F_DEC: f64 = 0.5;
    const ALPHA_START: f64 = 0.1;
    const F_ALPHA: f64 = 0.99;
    const N_MIN: usize = 5;

    let mut geom = geometry.clone();
    let mut results = calc.run(&geom)?;
    let n = geom.coords.len();
    let mut velocity = DVector::<f64>::zeros(n);
    let mut dt = DT_START;
    let mut alpha = ALPHA_START;
    let mut aligned_steps = 0usize;
    let mut steps_taken = 0;

    while steps_taken < params.max_steps && max_force(&results.forces) > params.fmax {
        // Forces per Angstrom drive the fictitious dynamics.
        let force = -gradient_angstrom(&results.forces);

        let power = force.dot(&velocity);
        if power > 0.0 {
            let vnorm = velocity.norm();
            let fnorm = force.norm();
            if fnorm > 0.0 {
                velocity = (1.0 - alpha) * &velocity + alpha * vnorm * (&force / fnorm);
            }
            aligned_steps += 1;
            if aligned_steps > N_MIN {
                dt = (dt * F_INC).min(DT_MAX);
                alpha *= F_ALPHA;
            }
        } else {
            velocity.fill(0.0);
            dt *= F_DEC;
            alpha = ALPHA_START;
            aligned_steps = 0;
        }

        velocity += &force * dt;
        let step = clamp_step(&velocity * dt, params.max_step_size);

        geom = geom.displaced(&step);
        steps_taken += 1;
        results = calc.run(&geom)?;
    }

    let converged = max_force(&results.forces) <= params.fmax;
    info!(
        "FIRE finished after {} steps (converged: {})",
        steps_taken, converged
    );
    Ok(OptOutcome {
        geometry: geom,
        results,
        converged,
        steps_taken,
    })
}

/// Follow the intrinsic reaction coordinate away from a saddle point.
///
/// The first step displaces along the normalized downhill direction, with
/// the sign chosen by `direction`; it is taken unconditionally so a
/// converged transition-state structure still leaves the saddle. Subsequent
/// steps are damped steepest descent.
pub fn drive_irc(
    calc: &QChemCalculator,
    geometry: &Geometry,
    params: &OptParams,
    direction: IrcDirection,
) -> Result<OptOutcome> {
    let mut geom = geometry.clone();
    let mut results = calc.run(&geom)?;
    let mut steps_taken = 0;

    if params.max_steps > 0 {
        let grad = gradient_angstrom(&results.forces);
        let norm = grad.norm();
        if norm > 0.0 {
            let sign = match direction {
                IrcDirection::Forward => -1.0,
                IrcDirection::Reverse => 1.0,
            };
            let step = sign * params.max_step_size * (&grad / norm);
            geom = geom.displaced(&step);
            steps_taken += 1;
            results = calc.run(&geom)?;
        }
    }

    while steps_taken < params.max_steps && max_force(&results.forces) > params.fmax {
        let grad = gradient_angstrom(&results.forces);
        let step = clamp_step(-grad, params.max_step_size);
        geom = geom.displaced(&step);
        steps_taken += 1;
        results = calc.run(&geom)?;
    }

    let converged = max_force(&results.forces) <= params.fmax;
    info!(
        "IRC ({:?}) finished after {} steps (converged: {})",
        direction, steps_taken, converged
    );
    Ok(OptOutcome {
        geometry: geom,
        results,
        converged,
        steps_taken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_force() {
        let f = DVector::from_vec(vec![0.01, -0.25, 0.003]);
        assert!((max_force(&f) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_step_preserves_direction() {
        let step = DVector::from_vec(vec![3.0, 4.0]);
        let clamped = clamp_step(step, 0.5);
        assert!((clamped.norm() - 0.5).abs() < 1e-12);
        assert!((clamped[0] / clamped[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_step_short_step_untouched() {
        let step = DVector::from_vec(vec![0.01, 0.02]);
        let clamped = clamp_step(step.clone(), 0.5);
        assert_eq!(clamped, step);
    }

    #[test]
    fn test_bfgs_update_skips_degenerate_change() {
        let mut hessian = DMatrix::<f64>::identity(2, 2);
        let s = DVector::from_vec(vec![0.1, 0.0]);
        let y = DVector::zeros(2);
        bfgs_update(&mut hessian, &s, &y);
        assert_eq!(hessian, DMatrix::<f64>::identity(2, 2));
    }

    #[test]
    fn test_bfgs_update_satisfies_secant_condition() {
        let mut hessian = DMatrix::<f64>::identity(2, 2);
        let s = DVector::from_vec(vec![0.1, -0.05]);
        let y = DVector::from_vec(vec![0.22, -0.13]);
        bfgs_update(&mut hessian, &s, &y);
        let hs = &hessian * &s;
        assert!((hs - &y).norm() < 1e-10);
    }

    #[test]
    fn test_bofill_update_satisfies_secant_condition() {
        let mut hessian = DMatrix::<f64>::identity(2, 2);
        let s = DVector::from_vec(vec![0.1, 0.02]);
        let y = DVector::from_vec(vec![-0.04, 0.07]);
        bofill_update(&mut hessian, &s, &y);
        let hs = &hessian * &s;
        assert!((hs - &y).norm() < 1e-10);
    }

    #[test]
    fn test_gradient_unit_conversion() {
        let forces = DVector::from_vec(vec![0.529177210903]);
        let grad = gradient_angstrom(&forces);
        assert!((grad[0] + 1.0).abs() < 1e-9);
    }
}
