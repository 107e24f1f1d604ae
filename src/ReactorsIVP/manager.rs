//! # Simulation manager
//!
//! ## Purpose
//! Drives the digester through the feed schedule. Every feed event opens a new
//! interval with its own frozen parameters; the stiff integrator is restarted at
//! each interval boundary and advanced in fixed output increments.
//!
//! ## States
//! ```text
//! Idle -> Configuring(i) -> Integrating(i) -> Updating(i) -> Configuring(i+1) | Done
//! ```
//!
//! ## Failure policy
//! Configuration problems are rejected when the manager is built. Failures while
//! integrating (pH solver, non-finite derivative, step-size collapse) end the run
//! and the rows computed so far are returned with [`RunStatus::Failed`].
//!
//! ## Diagnostics
//! Every configured interval leaves an [`IntervalRecord`] with its frozen growth
//! and Henry/Ka constants, and every row carries the specific growth rates at its
//! state. Both survive failed and cancelled runs.
//!
//! ## Usage
//! ```rust, ignore
//! let mut manager = Manager::from_input(input, &config.settings)?;
//! let result = manager.run();
//! ```
use crate::Chemistry::acid_constants::{AcidConstantTable, HenryConstants};
use crate::Chemistry::pH_equilibrium::{EquilibriumSolver, PhMethod};
use crate::Kinetics::growth::YieldMatrix;
use crate::Kinetics::kinetic_constants::{DEGRADER_COUNT, KineticConstantTable, TemperatureParameters};
use crate::Numerical::stiff_ivp::{SolverOptions, StiffIntegrator};
use crate::ReactorsIVP::digester_model::{DigesterModel, IntervalParameters};
use crate::ReactorsIVP::forcing::FeedSchedule;
use crate::ReactorsIVP::state_vector::{INOCULUM_LEN, STATE_LEN};
use crate::Utils::load_from_file::InputData;
use crate::errors::{ConfigError, DigesterError};
use crate::settings::SimulationSettings;
use log::{debug, error, info, warn};
use nalgebra::DVector;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Configuring(usize),
    Integrating(usize),
    Updating(usize),
    Done,
}

/// Shared flag to stop a running simulation at the next interval boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State after one output increment.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub interval: usize,
    pub t: f64,
    pub y: DVector<f64>,
    pub ph: f64,
    /// specific growth rates of the eight degraders at `y`
    pub mu: [f64; DEGRADER_COUNT],
}

/// Constants one interval was integrated with.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRecord {
    pub interval: usize,
    pub t_start: f64,
    pub t_end: f64,
    pub rates: TemperatureParameters,
    pub henry: HenryConstants,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed,
    Cancelled {
        interval: usize,
    },
    Failed {
        interval: usize,
        time: f64,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub rows: Vec<OutputRow>,
    /// one entry per interval that was started
    pub intervals: Vec<IntervalRecord>,
    pub status: RunStatus,
}

impl SimulationResult {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn final_state(&self) -> Option<&DVector<f64>> {
        self.rows.last().map(|row| &row.y)
    }
}

pub struct Manager {
    kinetics: KineticConstantTable,
    acids: AcidConstantTable,
    yields: YieldMatrix,
    schedule: FeedSchedule,
    initial_state: DVector<f64>,
    ph_method: PhMethod,
    step_size: f64,
    integrator: StiffIntegrator,
    state: DriverState,
}

impl Manager {
    /// `initial_state` is either the full state or the inoculum without gas
    /// accumulators, which start at zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kinetics: KineticConstantTable,
        acids: AcidConstantTable,
        yields: YieldMatrix,
        schedule: FeedSchedule,
        initial_state: DVector<f64>,
        ph_method: PhMethod,
        solver_options: SolverOptions,
        step_size: f64,
    ) -> Result<Self, ConfigError> {
        if !(step_size.is_finite() && step_size > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "step_size".to_string(),
                reason: format!("must be finite and positive, got {}", step_size),
            });
        }
        let initial_state = match initial_state.len() {
            STATE_LEN => initial_state,
            INOCULUM_LEN => initial_state.resize_vertically(STATE_LEN, 0.0),
            n => {
                return Err(ConfigError::InvalidInitialState(format!(
                    "expected {} or {} values, got {}",
                    INOCULUM_LEN, STATE_LEN, n
                )));
            }
        };
        if initial_state.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidInitialState(
                "non-finite value".to_string(),
            ));
        }
        if !(initial_state[0] > 0.0) {
            return Err(ConfigError::InvalidInitialState(format!(
                "reactor volume must be positive, got {}",
                initial_state[0]
            )));
        }
        schedule.validate()?;
        let integrator = StiffIntegrator::new(solver_options)?;
        Ok(Self {
            kinetics,
            acids,
            yields,
            schedule,
            initial_state,
            ph_method,
            step_size,
            integrator,
            state: DriverState::Idle,
        })
    }

    pub fn from_input(input: InputData, settings: &SimulationSettings) -> Result<Self, ConfigError> {
        settings.model()?;
        Self::new(
            input.kinetics,
            input.acids,
            input.yields,
            input.schedule,
            input.inoculum,
            settings.ph_method()?,
            settings.solver_options()?,
            settings.step_size()?,
        )
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn schedule(&self) -> &FeedSchedule {
        &self.schedule
    }

    pub fn run(&mut self) -> SimulationResult {
        self.run_observed(&CancellationToken::new(), |_| {})
    }

    pub fn run_with_cancellation(&mut self, token: &CancellationToken) -> SimulationResult {
        self.run_observed(token, |_| {})
    }

    /// Run the whole schedule; `observer` sees every row as soon as it is produced.
    pub fn run_observed<F>(&mut self, token: &CancellationToken, mut observer: F) -> SimulationResult
    where
        F: FnMut(&OutputRow),
    {
        info!(
            "starting simulation: {} intervals, step {}, pH method {}, solver {}",
            self.schedule.len(),
            self.step_size,
            self.ph_method.method_name(),
            self.integrator.options.method.name()
        );
        let mut rows: Vec<OutputRow> = Vec::new();
        let mut intervals: Vec<IntervalRecord> = Vec::new();
        let mut y = self.initial_state.clone();
        let mut t_start = 0.0;

        for (i, event) in self.schedule.events().iter().enumerate() {
            if token.is_cancelled() {
                warn!("simulation cancelled before interval {}", i);
                self.state = DriverState::Done;
                return SimulationResult {
                    rows,
                    intervals,
                    status: RunStatus::Cancelled { interval: i },
                };
            }
            self.state = DriverState::Configuring(i);
            let t_end = event.timepoint;
            let params = IntervalParameters::new(i, event, &self.kinetics, &self.acids);
            info!(
                "interval {}: t = {} .. {}, T = {}, Q_in = {}, Q_out = {}",
                i, t_start, t_end, event.temperature, event.flow_in, event.flow_out
            );
            intervals.push(IntervalRecord {
                interval: i,
                t_start,
                t_end,
                rates: params.rates,
                henry: params.henry,
            });
            let model = DigesterModel::new(&self.kinetics, &self.yields, &self.ph_method, params);
            self.integrator.reset(t_start, y.clone());

            self.state = DriverState::Integrating(i);
            let mut t = t_start;
            while t < t_end {
                let mut t_next = t + self.step_size;
                if t_next > t_end || t_end - t_next < 1e-9 * self.step_size {
                    t_next = t_end;
                }
                let step = self
                    .integrator
                    .advance_to(&model, t_next)
                    .map(|y_new| y_new.clone())
                    .and_then(|y_new| {
                        model
                            .diagnose(&y_new)
                            .map(|(eq, rates)| (y_new, eq.ph, rates.mu))
                    });
                match step {
                    Ok((y_new, ph, mu)) => {
                        y = y_new;
                        t = t_next;
                        debug!("t = {}: pH {:.4}, mu {:?}", t, ph, mu);
                        let row = OutputRow {
                            interval: i,
                            t,
                            y: y.clone(),
                            ph,
                            mu,
                        };
                        observer(&row);
                        rows.push(row);
                    }
                    Err(e) => {
                        self.state = DriverState::Done;
                        return failed(rows, intervals, i, t, e);
                    }
                }
            }

            self.state = DriverState::Updating(i);
            debug!("interval {} solver stats: {:?}", i, self.integrator.stats);
            t_start = t_end;
        }

        self.state = DriverState::Done;
        info!("simulation completed with {} rows", rows.len());
        SimulationResult {
            rows,
            intervals,
            status: RunStatus::Completed,
        }
    }
}

fn failed(
    rows: Vec<OutputRow>,
    intervals: Vec<IntervalRecord>,
    interval: usize,
    time: f64,
    e: DigesterError,
) -> SimulationResult {
    if e.is_recoverable() {
        error!("interval {} failed at t = {}: {}", interval, time, e);
    } else {
        error!("unexpected error in interval {} at t = {}: {}", interval, time, e);
    }
    SimulationResult {
        rows,
        intervals,
        status: RunStatus::Failed {
            interval,
            time,
            reason: e.to_string(),
        },
    }
}
