/// Kinetic constant table of the digester (`Const1`) and the temperature law of the
/// maximum specific growth rates. Rows 0 and 1 are hydrolysis, rows 2..=9 are the
/// eight degrader populations.
///
///  # Examples
/// ```
/// use BioGasSim::Kinetics::kinetic_constants::KineticRow;
/// let row = KineticRow {
///     reference_rate: 0.4,
///     alpha: 0.05,
///     t0: 20.0,
///     t_opt: 35.0,
///     t_max: 45.0,
///     ..KineticRow::default()
/// };
/// assert!((row.mu_max_at(30.0) - 0.9).abs() < 1e-12);
/// assert!((row.mu_max_at(40.0) - 0.575).abs() < 1e-12);
/// ```
pub mod kinetic_constants;
/// Monod and inhibition kinetics, pH inhibition, hydrolysis, cell death and decay,
/// and the yield matrix that maps process rates onto substrates.
pub mod growth;
