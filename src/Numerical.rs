/// Restartable stiff integrator (variable-step BDF1/BDF2 and backward Euler)
/// for right-hand sides that are ordinary fallible Rust functions.
///
///  # Examples
/// ```
/// use BioGasSim::Numerical::stiff_ivp::{OdeSystem, SolverOptions, StiffIntegrator};
/// use BioGasSim::errors::DigesterError;
/// use nalgebra::DVector;
/// struct Decay;
/// impl OdeSystem for Decay {
///     fn ndim(&self) -> usize { 1 }
///     fn rhs(&self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, DigesterError> {
///         Ok(-y)
///     }
/// }
/// let mut solver = StiffIntegrator::new(SolverOptions::default()).unwrap();
/// solver.reset(0.0, DVector::from_element(1, 1.0));
/// let y = solver.advance_to(&Decay, 1.0).unwrap();
/// assert!((y[0] - (-1.0f64).exp()).abs() < 1e-2);
/// ```
pub mod stiff_ivp;
#[cfg(test)]
mod stiff_ivp_tests;
