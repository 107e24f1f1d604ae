/// Charge balance of the reactor liquid and the root finders that close it.
/// `H` is found as the fixed point of the balance; Newton-Raphson, Brent-Dekker,
/// Secant and a fixed pH are available behind one trait.
///
///  # Examples
/// ```
/// use BioGasSim::Chemistry::pH_equilibrium::{ChargeBalance, EquilibriumSolver, PhMethod, FixedPh};
/// let method = PhMethod::Fixed(FixedPh { value: 7.0 });
/// let eq = method.solve(&ChargeBalance::default()).unwrap();
/// assert!((eq.h - 1e-7).abs() < 1e-20);
/// ```
#[allow(non_snake_case)]
pub mod pH_equilibrium;
/// Henry constants and acid dissociation constants as cubic polynomials of the
/// temperature offset from a reference temperature.
pub mod acid_constants;
