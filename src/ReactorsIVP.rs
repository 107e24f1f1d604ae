/// Index layout and column names of the 33-entry digester state.
pub mod state_vector;
/// Piecewise-constant feed schedule: timepoints, temperature, flows and inflow.
pub mod forcing;
/// Stripping of dissolved NH3, CH4, CO2 and H2S into the gas accumulators.
pub mod gas_transfer;
/// The digester ODE of one feed interval: pH, kinetics, dilution and gas transfer
/// assembled into `dy/dt`. Implements [`crate::Numerical::stiff_ivp::OdeSystem`].
pub mod digester_model;
/// Interval-by-interval driver with cancellation and partial results on failure.
///
///  # Examples
/// ```rust, ignore
/// use BioGasSim::ReactorsIVP::manager::{CancellationToken, Manager};
/// let mut manager = Manager::from_input(input, &config.settings)?;
/// let token = CancellationToken::new();
/// let result = manager.run_with_cancellation(&token);
/// println!("{:?}, {} rows", result.status, result.rows.len());
/// ```
pub mod manager;
#[cfg(test)]
mod manager_tests;
#[cfg(test)]
pub(crate) mod test_data;
