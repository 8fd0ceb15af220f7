//! Parameter validation for job functions.
//!
//! Every recipe validates its parameters before anything touches the
//! filesystem or the external program. The checks implemented here are:
//!
//! - Solvation model exclusivity (PCM dielectric vs. SMD solvent)
//! - IRC direction values
//! - Charge / spin-multiplicity consistency and defaulting
//! - Optimizer capability for saddle-point and IRC jobs

use crate::geometry::Geometry;
use crate::optimizer::OptimizerKind;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with user guidance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Mutually exclusive solvation models requested together
    ConflictingSolventModels,
    /// A parameter value outside its accepted set
    InvalidParameter,
    /// Charge and spin multiplicity disagree on electron parity
    InconsistentChargeSpin,
    /// Selected optimizer cannot perform the requested job
    UnsupportedOptimizer,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Direction for intrinsic reaction coordinate following.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrcDirection {
    /// Follow the reaction mode downhill in the forward sense
    Forward,
    /// Follow the reaction mode downhill in the reverse sense
    Reverse,
}

impl std::str::FromStr for IrcDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(IrcDirection::Forward),
            "reverse" => Ok(IrcDirection::Reverse),
            other => Err(ValidationError {
                category: ErrorCategory::InvalidParameter,
                message: format!("invalid IRC direction: {}", other),
                suggestion: Some("use \"forward\" or \"reverse\"".to_string()),
            }),
        }
    }
}

/// Rejects requests for both implicit solvation models at once.
///
/// PCM and SMD are alternative descriptions of the same physics; Q-Chem
/// accepts only one `solvent_method` per calculation.
pub fn check_solvent_models(
    pcm_dielectric: Option<f64>,
    smd_solvent: Option<&str>,
) -> ValidationResult<()> {
    if pcm_dielectric.is_some() && smd_solvent.is_some() {
        return Err(ValidationError {
            category: ErrorCategory::ConflictingSolventModels,
            message: "only one of a PCM dielectric and an SMD solvent may be specified".to_string(),
            suggestion: Some(
                "drop either pcm_dielectric or smd_solvent from the job parameters".to_string(),
            ),
        });
    }
    Ok(())
}

/// Resolves charge and spin multiplicity, applying defaults and checking parity.
///
/// A missing charge defaults to 0. A missing multiplicity defaults to the
/// lowest value consistent with the electron count: singlet for an even
/// count, doublet for odd. An explicit multiplicity must satisfy electron
/// parity (`multiplicity - 1` unpaired electrons) and cannot exceed what the
/// electron count allows.
pub fn check_charge_and_spin(
    geometry: &Geometry,
    charge: Option<i32>,
    spin_multiplicity: Option<u32>,
) -> ValidationResult<(i32, u32)> {
    let charge = charge.unwrap_or(0);
    let nelectrons = geometry.electron_count(charge);

    let multiplicity = match spin_multiplicity {
        None => {
            if nelectrons % 2 == 0 {
                1
            } else {
                2
            }
        }
        Some(m) => {
            if m == 0 {
                return Err(ValidationError {
                    category: ErrorCategory::InvalidParameter,
                    message: "spin multiplicity must be at least 1".to_string(),
                    suggestion: None,
                });
            }
            let unpaired = (m - 1) as usize;
            if unpaired % 2 != nelectrons % 2 || unpaired > nelectrons {
                return Err(ValidationError {
                    category: ErrorCategory::InconsistentChargeSpin,
                    message: format!(
                        "spin multiplicity {} is impossible for {} electrons (charge {})",
                        m, nelectrons, charge
                    ),
                    suggestion: Some(
                        "adjust the charge or pick a multiplicity with matching electron parity"
                            .to_string(),
                    ),
                });
            }
            m
        }
    };

    Ok((charge, multiplicity))
}

/// Requires an optimizer capable of saddle-point search / IRC following.
///
/// FIRE is a pure minimizer; transition-state and IRC jobs need the
/// quasi-Newton driver.
pub fn require_saddle_capable(kind: OptimizerKind) -> ValidationResult<()> {
    match kind {
        OptimizerKind::QuasiNewton => Ok(()),
        OptimizerKind::Fire => Err(ValidationError {
            category: ErrorCategory::UnsupportedOptimizer,
            message: "FIRE cannot drive transition-state or IRC jobs".to_string(),
            suggestion: Some("use the quasi-Newton optimizer for saddle searches".to_string()),
        }),
    }
}
