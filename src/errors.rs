//! # Error types
//!
//! Errors are split by the layer that raises them. Configuration errors are
//! fatal and stop a run before it starts; equilibrium, model and integrator
//! errors are recoverable at the interval level: the [`crate::ReactorsIVP::manager::Manager`]
//! catches them and hands back the rows computed so far.
use thiserror::Error;

/// Invalid or missing settings, malformed input tables, degenerate schedules.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("unknown {kind} method: {name}")]
    UnknownMethod { kind: String, name: String },
    #[error("invalid kinetic constant table: {0}")]
    InvalidKineticTable(String),
    #[error("invalid acid constant table: {0}")]
    InvalidAcidTable(String),
    #[error("invalid yield matrix: {0}")]
    InvalidYieldMatrix(String),
    #[error("invalid feed schedule: {0}")]
    InvalidSchedule(String),
    #[error(
        "feed schedule has {0} distinct time point(s); multi-day feeding needs at least two"
    )]
    SingleDayFeed(usize),
    #[error("invalid initial state: {0}")]
    InvalidInitialState(String),
}

/// Failures of the charge-balance root finder.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EquilibriumError {
    #[error("pH solver did not converge after {iterations} iterations (residual {residual:e})")]
    NonConvergence { iterations: usize, residual: f64 },
    #[error("invalid bracket [{lower:e}, {upper:e}]: residuals {f_lower:e} and {f_upper:e} have the same sign")]
    InvalidBracket {
        lower: f64,
        upper: f64,
        f_lower: f64,
        f_upper: f64,
    },
    #[error("hydrogen ion concentration left the physical range: {0:e}")]
    InvalidHydrogen(f64),
}

/// Failures inside the derivative evaluation that are not pH related.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("non-finite value in {0}")]
    NonFinite(String),
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("reactor volume must be positive, got {0}")]
    NonPositiveVolume(f64),
}

/// Failures reported by the stiff integrator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntegratorError {
    #[error("step size {h:e} fell below the minimum at t = {t}")]
    StepSizeTooSmall { t: f64, h: f64 },
    #[error("exceeded {0} internal steps")]
    TooManySteps(usize),
    #[error("iteration matrix is singular at t = {0}")]
    SingularMatrix(f64),
}

#[derive(Debug, Error)]
pub enum DigesterError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("equilibrium error: {0}")]
    Equilibrium(#[from] EquilibriumError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("integrator error: {0}")]
    Integrator(#[from] IntegratorError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("parse error in {file} at line {line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },
}

impl DigesterError {
    /// `true` for errors the driver turns into a partial result instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DigesterError::Equilibrium(_) | DigesterError::Model(_) | DigesterError::Integrator(_)
        )
    }
}
