use thiserror::Error;

use crate::types::Float;

pub type Result<T> = std::result::Result<T, ControlError>;

/// Error surfaced by a controller to the simulation loop.
///
/// Both kinds abort the current tick. They carry the name of the offending
/// controller (or event) so the caller can tell which instance is
/// misconfigured.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("controller '{controller}': configuration error: {source}")]
    Configuration {
        controller: String,
        #[source]
        source: ConfigError,
    },

    #[error("controller '{controller}': numerical degeneracy: {source}")]
    NumericalDegeneracy {
        controller: String,
        #[source]
        source: NumericalError,
    },
}

impl ControlError {
    pub fn configuration(controller: &str, source: ConfigError) -> Self {
        ControlError::Configuration {
            controller: controller.to_string(),
            source,
        }
    }

    pub fn degeneracy(controller: &str, source: NumericalError) -> Self {
        ControlError::NumericalDegeneracy {
            controller: controller.to_string(),
            source,
        }
    }

    /// Name of the controller that raised the error.
    pub fn controller(&self) -> &str {
        match self {
            ControlError::Configuration { controller, .. } => controller,
            ControlError::NumericalDegeneracy { controller, .. } => controller,
        }
    }
}

/// Violated precondition of a controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sampling interval {got} differs from the fixed step {expected}")]
    SamplingMismatch { expected: Float, got: Float },

    #[error("gravity is unset, init must run before update")]
    GravityUnset,

    #[error("gravity magnitude must be non-zero and finite, got {0}")]
    InvalidGravity(Float),

    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(Float),

    #[error("horizon of {duration}s holds no step of {dt}s")]
    EmptyHorizon { duration: Float, dt: Float },

    #[error("horizon of {steps} steps exceeds the limit of {max}")]
    HorizonTooLong { steps: Float, max: usize },

    #[error("regularization QonR must be positive and finite, got {0}")]
    InvalidRegularization(Float),

    #[error("invalid controlled DOFs {cdof:?}: {reason}")]
    InvalidControlledDofs {
        cdof: Vec<usize>,
        reason: &'static str,
    },

    #[error("gain matrix must be square, got {rows}x{cols}")]
    NonSquareGain { rows: usize, cols: usize },

    #[error("gain has a non-finite entry")]
    NonFiniteGain,

    #[error("cannot derive a critically damped gain from negative entry {0}")]
    NegativeGain(Float),

    #[error("{what} dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("reference trajectory is empty")]
    EmptyTrajectory,

    #[error("duration must be finite, got {0}")]
    InvalidDuration(Float),
}

/// Failure of the regularized horizon solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericalError {
    #[error("regularized normal matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("regularized normal matrix is ill-conditioned (rcond estimate {0:e})")]
    IllConditioned(Float),

    #[error("height-over-gravity ratio {pos_up} / {gravity} is not finite")]
    NonFiniteRatio { pos_up: Float, gravity: Float },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}
