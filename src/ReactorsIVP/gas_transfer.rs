//! # Gas transfer
//!
//! Stripping of NH3, CH4, CO2 and H2S from the liquid into the headspace. The
//! volatile fraction of each species is `a_i / k_h_i`, where `a_i` is the share of
//! the undissociated form at the current `H`. The total stripping rate follows
//! from the rate of change of the dissolved gases and of `H` itself, the latter
//! taken from the linearised charge balance.
use crate::Chemistry::acid_constants::HenryConstants;
use crate::ReactorsIVP::state_vector::{
    A, CO2, DISSOLVED_GASES, GAS, H2PO4, HAC, HBUT, HPR, HVAL, NH3, Z,
};
use crate::errors::ModelError;
use nalgebra::DVector;

/// NH3, CH4, CO2, H2S (g/mol)
pub const GAS_MOLAR_MASS: [f64; 4] = [14.0, 16.0, 44.0, 34.0];
/// L/mol at normal conditions
pub const MOLAR_VOLUME: f64 = 22.4;

/// Stripping rates of the four gases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasFlux {
    /// mass leaving the liquid, per litre
    pub gas_loss: [f64; 4],
    /// gas volume produced
    pub gas_volume: [f64; 4],
}

/// Volatile fractions `a` and their derivatives `da/dH`, both scaled by `1/k_h`.
pub fn partition_factors(h: f64, k: &HenryConstants) -> ([f64; 4], [f64; 4]) {
    let carbonate_den = h * (h + k.ka1_co2) + k.ka1_co2 * k.ka2_co2;
    let a = [
        k.ka_nh4 / (h + k.ka_nh4),
        1.0,
        h * h / carbonate_den,
        h / (h + k.ka_h2s),
    ];
    let da_dh = [
        -k.ka_nh4 / (h + k.ka_nh4).powi(2),
        0.0,
        k.ka1_co2 * h * (h + 2.0 * k.ka2_co2) / carbonate_den.powi(2),
        k.ka_h2s / (h + k.ka_h2s).powi(2),
    ];
    let mut scaled_a = [0.0; 4];
    let mut scaled_da = [0.0; 4];
    for i in 0..4 {
        scaled_a[i] = a[i] / k.k_h[i];
        scaled_da[i] = da_dh[i] / k.k_h[i];
    }
    (scaled_a, scaled_da)
}

/// Time derivative of `H` from the linearised charge balance.
///
/// All acid terms share the `KaHAc + H` denominator; `y_dot` is the derivative
/// before gas stripping.
pub fn hydrogen_rate(y: &DVector<f64>, y_dot: &DVector<f64>, h: f64, k: &HenryConstants) -> f64 {
    let acid_den = k.ka_hac + h;
    let numerator = k.ka_hac / acid_den * y_dot[HAC] / 60.0
        + k.ka_hpr / acid_den * y_dot[HPR] / 74.0
        + k.ka_hbut / acid_den * y_dot[HBUT] / 88.0
        + k.ka_hval / acid_den * y_dot[HVAL] / 102.0
        + y_dot[A] / 35.5
        - y_dot[Z] / 39.0
        + (1.0 + k.ka_h2po4 / (k.ka_h2po4 - h)) * y_dot[H2PO4] / 31.0;
    let carbonate_den = h * (h + k.ka1_co2) + k.ka1_co2 * k.ka2_co2;
    let denominator = ((k.ka1_co2 - 1.0) * k.ka2_co2 - h * h) * y[CO2] / 44.0
        / carbonate_den.powi(2)
        + k.ka_hac / acid_den.powi(2) * y[HAC] / 60.0
        + k.ka_hpr / acid_den.powi(2) * y[HPR] / 74.0
        + k.ka_hbut / acid_den.powi(2) * y[HBUT] / 88.0
        + k.ka_hval / acid_den.powi(2) * y[HVAL] / 102.0
        - k.kw / (h * h)
        - 1.0
        + k.ka_h2po4 / (k.ka_h2po4 + h).powi(2) * y[H2PO4] / 31.0
        + k.ka_nh4 / (k.ka_nh4 + h).powi(2) * y[NH3] / 14.0;
    -numerator / denominator
}

/// Gas stripping for state `y`, pre-stripping derivative `y_dot` and hydrogen
/// concentration `h`.
pub fn gas_flux(
    y: &DVector<f64>,
    y_dot: &DVector<f64>,
    h: f64,
    volume: f64,
    k: &HenryConstants,
) -> Result<GasFlux, ModelError> {
    let mut conc = [0.0; 4];
    let mut dconc = [0.0; 4];
    for (i, &idx) in DISSOLVED_GASES.iter().enumerate() {
        conc[i] = y[idx] / GAS_MOLAR_MASS[i];
        dconc[i] = y_dot[idx] / GAS_MOLAR_MASS[i];
    }
    let (a, da_dh) = partition_factors(h, k);

    let capacity: f64 = (0..4).map(|i| a[i] * a[i] * conc[i]).sum();
    if capacity == 0.0 {
        return Ok(GasFlux {
            gas_loss: [0.0; 4],
            gas_volume: [0.0; 4],
        });
    }
    let dh_dt = hydrogen_rate(y, y_dot, h, k);
    if !dh_dt.is_finite() {
        return Err(ModelError::NonFinite("dH/dt".to_string()));
    }
    let fraction = (0..4)
        .map(|i| a[i] * dconc[i] + da_dh[i] * dh_dt * conc[i])
        .sum::<f64>()
        / capacity;
    if !fraction.is_finite() {
        return Err(ModelError::NonFinite("gas flow fraction".to_string()));
    }

    let mut flux = GasFlux {
        gas_loss: [0.0; 4],
        gas_volume: [0.0; 4],
    };
    for i in 0..4 {
        let molar_flow = fraction * a[i] * conc[i];
        flux.gas_loss[i] = molar_flow * GAS_MOLAR_MASS[i];
        flux.gas_volume[i] = molar_flow * MOLAR_VOLUME * volume;
    }
    Ok(flux)
}

impl GasFlux {
    /// Remove the stripped mass from the liquid and book the gas volume.
    pub fn apply(&self, y_dot: &mut DVector<f64>) {
        for (i, &idx) in DISSOLVED_GASES.iter().enumerate() {
            y_dot[idx] -= self.gas_loss[i];
            y_dot[GAS.start + i] = self.gas_volume[i];
        }
    }
}
