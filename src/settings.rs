//! # Settings Module
//!
//! ## Purpose
//! Typed JSON configuration of a simulation run: where the input tables live,
//! the output increment, how pH is computed and how the stiff integrator is tuned.
//!
//! ## File layout
//! ```json
//! {
//!   "metadata": {"name": "reactor A", "description": "", "tags": "", "data": "input/"},
//!   "settings": {
//!     "step_size": 0.5,
//!     "ph": {"method": "fixed", "value": 7.5},
//!     "solver": {"method": "bdf", "order": 1, "nsteps": 500, "relative": 1e-4, "absolute": 1e-8},
//!     "output": "result.csv"
//!   }
//! }
//! ```
//!
//! ## Defaults
//! | key | default |
//! |-----|---------|
//! | `ph.method` | `"fixed"` with `value = 7.5` |
//! | `solver.method` | `"bdf"` |
//! | `solver.order` | 1 |
//! | `solver.nsteps` | 500 per output increment |
//! | `solver.relative` / `solver.absolute` | 1e-4 / 1e-8 |
//! | `model` | `"standard"` |
//!
//! `step_size` and `metadata.data` have no default; leaving them out is a
//! [`ConfigError::MissingField`].
//!
//! ## Usage Pattern
//! ```rust, ignore
//! use BioGasSim::settings::load_config;
//!
//! let config = load_config("run.json")?;
//! let ph = config.settings.ph_method()?;
//! let solver = config.settings.solver_options()?;
//! ```
use crate::Chemistry::pH_equilibrium::{BrentDekker, FixedPh, NewtonRaphson, PhMethod, Secant};
use crate::Numerical::stiff_ivp::{SolverMethod, SolverOptions};
use crate::errors::{ConfigError, DigesterError};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Descriptive part of the configuration plus the input folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub tags: String,
    /// Folder with the `*.constant` input tables.
    pub data: Option<String>,
}

/// pH computation. Only the keys of the chosen method are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhSettings {
    pub method: String,
    /// pH for the `"fixed"` method
    pub value: Option<f64>,
    pub initial_guess: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<usize>,
}

impl Default for PhSettings {
    fn default() -> Self {
        Self {
            method: "fixed".to_string(),
            value: None,
            initial_guess: None,
            lower: None,
            upper: None,
            tolerance: None,
            max_iterations: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub method: String,
    pub order: Option<usize>,
    pub nsteps: Option<usize>,
    pub relative: Option<f64>,
    pub absolute: Option<f64>,
    pub first_step: Option<f64>,
    pub max_step: Option<f64>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            method: "bdf".to_string(),
            order: None,
            nsteps: None,
            relative: None,
            absolute: None,
            first_step: None,
            max_step: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Output increment in hours.
    pub step_size: Option<f64>,
    pub ph: PhSettings,
    pub solver: SolverSettings,
    /// CSV file for the raw rows; gas rates and diagnostics go next to it.
    pub output: Option<String>,
    /// Digester model; only `"standard"` exists.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub metadata: Metadata,
    pub settings: SimulationSettings,
}

fn positive(field: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be finite and positive, got {}", value),
        })
    }
}

pub const STANDARD_MODEL: &str = "standard";

impl SimulationSettings {
    pub fn model(&self) -> Result<&str, ConfigError> {
        match self.model.as_deref() {
            None | Some(STANDARD_MODEL) => Ok(STANDARD_MODEL),
            Some(other) => Err(ConfigError::UnknownMethod {
                kind: "model".to_string(),
                name: other.to_string(),
            }),
        }
    }

    pub fn step_size(&self) -> Result<f64, ConfigError> {
        let step = self
            .step_size
            .ok_or_else(|| ConfigError::MissingField("settings.step_size".to_string()))?;
        positive("settings.step_size", step)
    }

    /// Build the pH solver. Keys that are left out fall back to the method's defaults.
    pub fn ph_method(&self) -> Result<PhMethod, ConfigError> {
        let ph = &self.ph;
        if let Some(tol) = ph.tolerance {
            positive("ph.tolerance", tol)?;
        }
        if ph.max_iterations == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "ph.max_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let method = match ph.method.as_str() {
            "fixed" => {
                let default = FixedPh::default();
                let value = ph.value.unwrap_or(default.value);
                if !value.is_finite() {
                    return Err(ConfigError::InvalidValue {
                        field: "ph.value".to_string(),
                        reason: format!("must be finite, got {}", value),
                    });
                }
                PhMethod::Fixed(FixedPh { value })
            }
            "newton-raphson" => {
                let default = NewtonRaphson::default();
                PhMethod::NewtonRaphson(NewtonRaphson {
                    initial_guess: positive(
                        "ph.initial_guess",
                        ph.initial_guess.unwrap_or(default.initial_guess),
                    )?,
                    tolerance: ph.tolerance.unwrap_or(default.tolerance),
                    max_iterations: ph.max_iterations.unwrap_or(default.max_iterations),
                })
            }
            "brent-dekker" => {
                let default = BrentDekker::default();
                let lower = positive("ph.lower", ph.lower.unwrap_or(default.lower))?;
                let upper = positive("ph.upper", ph.upper.unwrap_or(default.upper))?;
                if lower >= upper {
                    return Err(ConfigError::InvalidValue {
                        field: "ph.lower".to_string(),
                        reason: format!("bracket [{}, {}] is empty", lower, upper),
                    });
                }
                PhMethod::BrentDekker(BrentDekker {
                    lower,
                    upper,
                    tolerance: ph.tolerance.unwrap_or(default.tolerance),
                    max_iterations: ph.max_iterations.unwrap_or(default.max_iterations),
                })
            }
            "secant" => {
                let default = Secant::default();
                PhMethod::Secant(Secant {
                    initial_guess: positive(
                        "ph.initial_guess",
                        ph.initial_guess.unwrap_or(default.initial_guess),
                    )?,
                    tolerance: ph.tolerance.unwrap_or(default.tolerance),
                    max_iterations: ph.max_iterations.unwrap_or(default.max_iterations),
                })
            }
            other => {
                return Err(ConfigError::UnknownMethod {
                    kind: "pH".to_string(),
                    name: other.to_string(),
                });
            }
        };
        Ok(method)
    }

    /// Build and validate the integrator options.
    pub fn solver_options(&self) -> Result<SolverOptions, ConfigError> {
        let solver = &self.solver;
        let default = SolverOptions::default();
        let method = match solver.method.as_str() {
            "bdf" => SolverMethod::Bdf {
                order: solver.order.unwrap_or(default.method.max_order()),
            },
            "backward-euler" => SolverMethod::BackwardEuler,
            other => {
                return Err(ConfigError::UnknownMethod {
                    kind: "solver".to_string(),
                    name: other.to_string(),
                });
            }
        };
        let options = SolverOptions {
            method,
            rtol: solver.relative.unwrap_or(default.rtol),
            atol: solver.absolute.unwrap_or(default.atol),
            nsteps: solver.nsteps.unwrap_or(default.nsteps),
            first_step: solver.first_step,
            max_step: solver.max_step.unwrap_or(default.max_step),
            ..default
        };
        options.validate()?;
        Ok(options)
    }
}

impl SimulationConfig {
    /// Check everything the run needs before any input is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata.data.is_none() {
            return Err(ConfigError::MissingField("metadata.data".to_string()));
        }
        self.settings.model()?;
        self.settings.step_size()?;
        self.settings.ph_method()?;
        self.settings.solver_options()?;
        Ok(())
    }

    /// Input folder; relative paths are resolved against `base`, usually the
    /// directory of the configuration file.
    pub fn data_dir(&self, base: &Path) -> Result<PathBuf, ConfigError> {
        let data = self
            .metadata
            .data
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("metadata.data".to_string()))?;
        let path = Path::new(data);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        })
    }
}

/// Read and validate a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SimulationConfig, DigesterError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config: SimulationConfig = serde_json::from_str(&content)?;
    config.validate()?;
    info!(
        "loaded configuration '{}' from {}",
        config.metadata.name,
        path.display()
    );
    Ok(config)
}
