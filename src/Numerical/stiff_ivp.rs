//! # Stiff initial value problem solver
//!
//! ## Purpose
//! Variable-step implicit integrator for `dy/dt = f(t, y)` where `f` is an
//! arbitrary fallible Rust function (the digester right-hand side solves a pH
//! equilibrium inside every evaluation, so it cannot be written symbolically).
//!
//! ## Methods
//! - `SolverMethod::Bdf { order }`: variable-coefficient BDF of order 1 or 2.
//!   The first step after [`StiffIntegrator::reset`] is always taken with order 1
//!   because no history exists yet.
//! - `SolverMethod::BackwardEuler`: BDF1 throughout.
//!
//! ## Algorithm
//! Each step solves the implicit stage with a simplified Newton iteration on
//! `I - alpha*h*J`, where `J` is a forward-difference Jacobian factored with
//! nalgebra's LU. The Jacobian is kept across steps and refreshed when Newton
//! stalls. The local error is estimated from the distance between the implicit
//! solution and an explicit predictor; steps are accepted when its weighted RMS
//! norm is at most one.
//!
//! ```text
//! BDF2, w = h_n / h_(n-1):
//! y_(n+1) - (1+w)^2/(1+2w) y_n + w^2/(1+2w) y_(n-1) = h (1+w)/(1+2w) f(t_(n+1), y_(n+1))
//! ```
use crate::errors::{ConfigError, DigesterError, IntegratorError};
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Right-hand side of `dy/dt = f(t, y)`.
pub trait OdeSystem {
    /// Number of state variables.
    fn ndim(&self) -> usize;

    fn rhs(&self, t: f64, y: &DVector<f64>) -> Result<DVector<f64>, DigesterError>;

    /// Forward-difference Jacobian around `(t, y)` with `f0 = f(t, y)` already known.
    fn jacobian(
        &self,
        t: f64,
        y: &DVector<f64>,
        f0: &DVector<f64>,
    ) -> Result<DMatrix<f64>, DigesterError> {
        let n = self.ndim();
        let mut jac = DMatrix::zeros(n, n);
        let mut yp = y.clone();
        let sqrt_eps = f64::EPSILON.sqrt();
        for j in 0..n {
            let orig = yp[j];
            let delta = sqrt_eps * orig.abs().max(1e-3);
            yp[j] = orig + delta;
            let fp = self.rhs(t, &yp)?;
            yp[j] = orig;
            for i in 0..n {
                jac[(i, j)] = (fp[i] - f0[i]) / delta;
            }
        }
        Ok(jac)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverMethod {
    Bdf { order: usize },
    BackwardEuler,
}

impl SolverMethod {
    pub fn max_order(&self) -> usize {
        match self {
            SolverMethod::Bdf { order } => *order,
            SolverMethod::BackwardEuler => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SolverMethod::Bdf { .. } => "bdf",
            SolverMethod::BackwardEuler => "backward-euler",
        }
    }
}

/// BDF of order 1, the stiff default of the digester runs.
impl Default for SolverMethod {
    fn default() -> Self {
        SolverMethod::Bdf { order: 1 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub method: SolverMethod,
    pub rtol: f64,
    pub atol: f64,
    /// Maximum internal steps per call to [`StiffIntegrator::advance_to`].
    pub nsteps: usize,
    /// Initial step size; `None` picks one from the first derivative.
    pub first_step: Option<f64>,
    pub min_step: f64,
    pub max_step: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            method: SolverMethod::default(),
            rtol: 1e-4,
            atol: 1e-8,
            nsteps: 500,
            first_step: None,
            min_step: 1e-12,
            max_step: f64::INFINITY,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |field: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("must be finite and positive, got {}", v),
                })
            }
        };
        positive("solver.relative", self.rtol)?;
        positive("solver.absolute", self.atol)?;
        positive("solver.min_step", self.min_step)?;
        if let Some(h0) = self.first_step {
            positive("solver.first_step", h0)?;
        }
        if !(self.max_step > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "solver.max_step".to_string(),
                reason: format!("must be positive, got {}", self.max_step),
            });
        }
        if self.nsteps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "solver.nsteps".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if let SolverMethod::Bdf { order } = self.method {
            if !(1..=2).contains(&order) {
                return Err(ConfigError::InvalidValue {
                    field: "solver.order".to_string(),
                    reason: format!("BDF order must be 1 or 2, got {}", order),
                });
            }
        }
        Ok(())
    }
}

/// Counters accumulated since the last [`StiffIntegrator::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntegratorStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_evaluations: usize,
    pub jacobian_evaluations: usize,
    pub newton_failures: usize,
}

const MAX_NEWTON_ITERATIONS: usize = 7;
const NEWTON_TOLERANCE: f64 = 0.03;
const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Outcome of a single attempted step.
enum Attempt {
    Accepted { y_new: DVector<f64>, err_norm: f64 },
    Rejected { err_norm: f64 },
    NewtonFailed(Option<DigesterError>),
}

/// Restartable implicit integrator. Owns the current point, the previous point
/// used by BDF2, the step-size proposal and the cached Jacobian.
#[derive(Debug, Clone)]
pub struct StiffIntegrator {
    pub options: SolverOptions,
    t: f64,
    y: DVector<f64>,
    f: Option<DVector<f64>>,
    /// `(h_prev, y_prev)` of the last accepted step
    history: Option<(f64, DVector<f64>)>,
    h: Option<f64>,
    /// `(t, J)`: Jacobian and the time it was evaluated at
    jacobian: Option<(f64, DMatrix<f64>)>,
    pub stats: IntegratorStats,
}

impl StiffIntegrator {
    pub fn new(options: SolverOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            t: 0.0,
            y: DVector::zeros(0),
            f: None,
            history: None,
            h: None,
            jacobian: None,
            stats: IntegratorStats::default(),
        })
    }

    /// Restart at `(t0, y0)`, discarding step history, step size and Jacobian.
    pub fn reset(&mut self, t0: f64, y0: DVector<f64>) {
        self.t = t0;
        self.y = y0;
        self.f = None;
        self.history = None;
        self.h = None;
        self.jacobian = None;
        self.stats = IntegratorStats::default();
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    /// Integrate from the current point up to exactly `t_target`.
    pub fn advance_to<S: OdeSystem>(
        &mut self,
        system: &S,
        t_target: f64,
    ) -> Result<&DVector<f64>, DigesterError> {
        if self.y.len() != system.ndim() {
            return Err(crate::errors::ModelError::DimensionMismatch {
                expected: system.ndim(),
                got: self.y.len(),
            }
            .into());
        }
        let mut steps = 0;
        while self.t < t_target {
            if steps >= self.options.nsteps {
                return Err(IntegratorError::TooManySteps(self.options.nsteps).into());
            }
            self.step(system, t_target)?;
            steps += 1;
        }
        Ok(&self.y)
    }

    fn derivative_at_current<S: OdeSystem>(
        &mut self,
        system: &S,
    ) -> Result<DVector<f64>, DigesterError> {
        if let Some(f) = &self.f {
            return Ok(f.clone());
        }
        let f = system.rhs(self.t, &self.y)?;
        self.stats.rhs_evaluations += 1;
        if f.iter().any(|v| !v.is_finite()) {
            return Err(crate::errors::ModelError::NonFinite(format!(
                "derivative at t = {}",
                self.t
            ))
            .into());
        }
        self.f = Some(f.clone());
        Ok(f)
    }

    fn initial_step(&self, f0: &DVector<f64>, span: f64) -> f64 {
        if let Some(h0) = self.options.first_step {
            return h0.min(span);
        }
        let d0 = self.weighted_rms(&self.y, &self.y, &self.y);
        let d1 = self.weighted_rms(f0, &self.y, &self.y);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        h0.min(span).min(self.options.max_step).max(self.options.min_step)
    }

    fn weighted_rms(&self, v: &DVector<f64>, y_a: &DVector<f64>, y_b: &DVector<f64>) -> f64 {
        let n = v.len().max(1);
        let sum: f64 = v
            .iter()
            .zip(y_a.iter().zip(y_b.iter()))
            .map(|(vi, (a, b))| {
                let scale = self.options.atol + self.options.rtol * a.abs().max(b.abs());
                (vi / scale).powi(2)
            })
            .sum();
        (sum / n as f64).sqrt()
    }

    fn step<S: OdeSystem>(&mut self, system: &S, t_target: f64) -> Result<(), DigesterError> {
        let f0 = self.derivative_at_current(system)?;
        let remaining = t_target - self.t;
        let mut h_proposed = match self.h {
            Some(h) => h,
            None => self.initial_step(&f0, remaining),
        };
        let mut last_error: Option<DigesterError> = None;
        loop {
            let clipped = h_proposed >= remaining;
            let h = if clipped { remaining } else { h_proposed };
            if h < self.options.min_step && !clipped {
                return Err(last_error.unwrap_or_else(|| {
                    IntegratorError::StepSizeTooSmall { t: self.t, h }.into()
                }));
            }
            let order = match &self.history {
                Some(_) => self.options.method.max_order(),
                None => 1,
            };
            if self.jacobian.is_none() {
                self.jacobian = Some((self.t, system.jacobian(self.t, &self.y, &f0)?));
                self.stats.jacobian_evaluations += 1;
                self.stats.rhs_evaluations += system.ndim();
            }
            match self.attempt(system, h, order, &f0)? {
                Attempt::Accepted { y_new, err_norm } => {
                    self.history = Some((h, std::mem::replace(&mut self.y, y_new)));
                    self.t = if clipped { t_target } else { self.t + h };
                    self.f = None;
                    self.stats.accepted_steps += 1;
                    let factor = if err_norm == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * err_norm.powf(-1.0 / (order as f64 + 1.0)))
                            .clamp(MIN_FACTOR, MAX_FACTOR)
                    };
                    let mut next = (h * factor).min(self.options.max_step);
                    if clipped {
                        next = next.max(h_proposed.min(self.options.max_step));
                    }
                    self.h = Some(next);
                    return Ok(());
                }
                Attempt::Rejected { err_norm } => {
                    self.stats.rejected_steps += 1;
                    let factor = (SAFETY * err_norm.powf(-1.0 / (order as f64 + 1.0)))
                        .clamp(MIN_FACTOR, SAFETY);
                    h_proposed = h * factor;
                }
                Attempt::NewtonFailed(err) => {
                    self.stats.newton_failures += 1;
                    if err.is_some() {
                        last_error = err;
                    }
                    // refresh a stale Jacobian and halve the step
                    if matches!(self.jacobian, Some((t_jac, _)) if t_jac != self.t) {
                        self.jacobian = None;
                    }
                    h_proposed = h * 0.5;
                    debug!(
                        "Newton failed at t = {}, retrying with h = {:e}",
                        self.t, h_proposed
                    );
                }
            }
        }
    }

    fn attempt<S: OdeSystem>(
        &mut self,
        system: &S,
        h: f64,
        order: usize,
        f0: &DVector<f64>,
    ) -> Result<Attempt, DigesterError> {
        let n = self.y.len();
        let t_new = self.t + h;

        // implicit stage y = psi + alpha*h*f(t_new, y), explicit predictor, error constant
        let (alpha, psi, predictor, error_constant) = match (&self.history, order) {
            (Some((h_prev, y_prev)), 2) => {
                let w = h / h_prev;
                let denom = 1.0 + 2.0 * w;
                let alpha = (1.0 + w) / denom;
                let psi = &self.y * ((1.0 + w).powi(2) / denom) - y_prev * (w * w / denom);
                // quadratic through y_prev, y and tangent f0 at y
                let c = (y_prev - &self.y + f0 * (h / w)) * (w * w);
                let predictor = &self.y + f0 * h + c;
                (alpha, psi, predictor, 0.4)
            }
            _ => {
                let predictor = &self.y + f0 * h;
                (1.0, self.y.clone(), predictor, 0.5)
            }
        };

        let jac = match &self.jacobian {
            Some((_, j)) => j,
            None => return Ok(Attempt::NewtonFailed(None)),
        };
        let iteration_matrix = DMatrix::<f64>::identity(n, n) - jac * (alpha * h);
        let lu = iteration_matrix.lu();
        if !lu.is_invertible() {
            return Err(IntegratorError::SingularMatrix(t_new).into());
        }

        let mut y_new = predictor.clone();
        let mut converged = false;
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let f_new = match system.rhs(t_new, &y_new) {
                Ok(f) => f,
                Err(e) => return Ok(Attempt::NewtonFailed(Some(e))),
            };
            self.stats.rhs_evaluations += 1;
            let residual = &psi + f_new * (alpha * h) - &y_new;
            let delta = match lu.solve(&residual) {
                Some(d) => d,
                None => return Err(IntegratorError::SingularMatrix(t_new).into()),
            };
            if delta.iter().any(|v| !v.is_finite()) {
                return Ok(Attempt::NewtonFailed(None));
            }
            y_new += &delta;
            if self.weighted_rms(&delta, &self.y, &y_new) < NEWTON_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            return Ok(Attempt::NewtonFailed(None));
        }

        let err = (&y_new - &predictor) * error_constant;
        let err_norm = self.weighted_rms(&err, &self.y, &y_new);
        if err_norm.is_finite() && err_norm <= 1.0 {
            Ok(Attempt::Accepted { y_new, err_norm })
        } else if err_norm.is_finite() {
            Ok(Attempt::Rejected { err_norm })
        } else {
            Ok(Attempt::NewtonFailed(None))
        }
    }
}
