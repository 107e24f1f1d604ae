//! # Growth and reaction rates
//!
//! ## Purpose
//! Evaluates, for one state snapshot, the specific growth rates of the eight
//! degrader populations, their death, the decay of dead cells and the hydrolysis
//! of insoluble carbohydrates and proteins. The result is the reaction-rate vector
//! `z` that the yield matrix maps onto the substrate derivatives.
//!
//! ## Rate vector
//! ```text
//! z = [cell_decay, hyd_carb, hyd_prot, mu[0]*X[0], ..., mu[7]*X[7]]
//! ```
//! `mu[k] = mu_max[k] * f_pH[k] * M_k` where `M_k` is the Monod/inhibition term of
//! pathway `k` and `f_pH` the pH inhibition factor
//! ```text
//! f_pH = (1 + 2*10^(0.5*(pKlow - pKhigh))) / (1 + 10^(pH - pKhigh) + 10^(pKlow - pH))
//! ```
use crate::Chemistry::pH_equilibrium::Equilibrium;
use crate::Kinetics::kinetic_constants::{DEGRADER_COUNT, KineticConstantTable, TemperatureParameters};
use crate::errors::ConfigError;
use nalgebra::{DMatrix, DVector};

/// first-order death constant of degraders
pub const KD0: f64 = 0.05;
/// first-order decay constant of dead cells
pub const DEAD_CELL_DECAY: f64 = 0.01;
/// number of processes in `z`
pub const REACTION_COUNT: usize = 3 + DEGRADER_COUNT;
/// number of substrates produced or consumed through the yield matrix
pub const YIELD_SUBSTRATES: usize = 16;
pub const SUBSTRATE_COUNT: usize = 19;

/// Substrate concentrations in their canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Substrates {
    pub carbo_is: f64,
    pub carbo_in: f64,
    pub carbon: f64,
    pub lipids: f64,
    pub lcfa: f64,
    pub prot_is: f64,
    pub prot_in: f64,
    pub amino: f64,
    pub nh3: f64,
    pub hac: f64,
    pub hpr: f64,
    pub hbut: f64,
    pub hval: f64,
    pub ch4: f64,
    pub co2: f64,
    pub h2s: f64,
    pub z: f64,
    pub h2po4: f64,
    pub a: f64,
}

impl Substrates {
    /// `values` holds at least the 19 substrates in canonical order.
    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            carbo_is: values[0],
            carbo_in: values[1],
            carbon: values[2],
            lipids: values[3],
            lcfa: values[4],
            prot_is: values[5],
            prot_in: values[6],
            amino: values[7],
            nh3: values[8],
            hac: values[9],
            hpr: values[10],
            hbut: values[11],
            hval: values[12],
            ch4: values[13],
            co2: values[14],
            h2s: values[15],
            z: values[16],
            h2po4: values[17],
            a: values[18],
        }
    }

    /// VFA weighting shared by both hydrolysis inhibitions.
    fn vfa_inhibition_load(&self) -> f64 {
        self.hac + 0.811 * self.hpr + 0.682 * self.hbut + 0.588 * self.hval
    }
}

/// Yield coefficient matrix, `REACTION_COUNT x YIELD_SUBSTRATES`.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldMatrix {
    pub matrix: DMatrix<f64>,
}

impl YieldMatrix {
    pub fn new(matrix: DMatrix<f64>) -> Result<Self, ConfigError> {
        if matrix.nrows() != REACTION_COUNT || matrix.ncols() != YIELD_SUBSTRATES {
            return Err(ConfigError::InvalidYieldMatrix(format!(
                "expected {}x{}, got {}x{}",
                REACTION_COUNT,
                YIELD_SUBSTRATES,
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidYieldMatrix(
                "non-finite coefficient".to_string(),
            ));
        }
        Ok(Self { matrix })
    }

    /// `Y^T z`: production rates of the first 16 substrates.
    pub fn production(&self, z: &DVector<f64>) -> DVector<f64> {
        self.matrix.tr_mul(z)
    }
}

pub fn ph_inhibition(ph: f64, pk_low: f64, pk_high: f64) -> f64 {
    (1.0 + 2.0 * 10f64.powf(0.5 * (pk_low - pk_high)))
        / (1.0 + 10f64.powf(ph - pk_high) + 10f64.powf(pk_low - ph))
}

/// Monod and inhibition terms `M_k` of the eight pathways.
pub fn monod_terms(
    table: &KineticConstantTable,
    s: &Substrates,
    h: f64,
    ka_nh4: f64,
) -> [f64; DEGRADER_COUNT] {
    let r = |k: usize| table.degrader(k);
    let ki_hac_hpr = table.ki_hac_hpr();
    let ki_hac_hbut = table.ki_hac_hbut();
    let ki_hac_hval = table.ki_hac_hval();
    let ki_nh3_hac = table.ki_nh3_hac();
    let lcfa_inhibition = |k: usize| r(k).ki_lcfa / (s.lcfa + r(k).ki_lcfa);
    let nh3_saturation = |k: usize| s.nh3 / (r(k).ks_nh3 + s.nh3);
    let saturation = |k: usize, c: f64| c / (r(k).ks + c);

    let free_ammonia = s.nh3 * ka_nh4 / (h + ka_nh4);
    [
        // carbohydrate
        saturation(0, s.carbon) * nh3_saturation(0) * lcfa_inhibition(0),
        // amino acid
        saturation(1, s.amino) * lcfa_inhibition(1),
        // lipid
        saturation(2, s.lipids) * nh3_saturation(2) * lcfa_inhibition(2),
        // LCFA, Haldane
        s.nh3 * s.lcfa
            / ((s.lcfa + r(3).ks + s.lcfa * s.lcfa / r(3).ki_lcfa) * (r(3).ks_nh3 + s.nh3)),
        // propionate
        saturation(4, s.hpr) * nh3_saturation(4) * lcfa_inhibition(4) * ki_hac_hpr
            / (s.hac + ki_hac_hpr),
        // butyrate
        saturation(5, s.hbut) * nh3_saturation(5) * lcfa_inhibition(5) * ki_hac_hbut
            / (s.hac + ki_hac_hbut),
        // valerate
        saturation(6, s.hval) * nh3_saturation(6) * lcfa_inhibition(6) * ki_hac_hval
            / (s.hac + ki_hac_hval),
        // acetate, inhibited by free ammonia
        saturation(7, s.hac) * nh3_saturation(7) * lcfa_inhibition(7) * ki_nh3_hac
            / (free_ammonia + ki_nh3_hac),
    ]
}

/// Everything the derivative needs from the biology of one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionRates {
    pub mu: [f64; DEGRADER_COUNT],
    pub cell_death: [f64; DEGRADER_COUNT],
    pub cell_decay: f64,
    pub hydrolysis_carbo: f64,
    pub hydrolysis_prot: f64,
    /// length `REACTION_COUNT`
    pub z: DVector<f64>,
}

impl ReactionRates {
    pub fn evaluate(
        table: &KineticConstantTable,
        params: &TemperatureParameters,
        s: &Substrates,
        degraders: &[f64],
        dead_cells: f64,
        equilibrium: &Equilibrium,
        ka_nh4: f64,
    ) -> Self {
        let monod = monod_terms(table, s, equilibrium.h, ka_nh4);
        let mut mu = [0.0; DEGRADER_COUNT];
        let mut cell_death = [0.0; DEGRADER_COUNT];
        for k in 0..DEGRADER_COUNT {
            let row = table.degrader(k);
            mu[k] = params.mu_max[k] * ph_inhibition(equilibrium.ph, row.pk_low, row.pk_high) * monod[k];
            cell_death[k] = params.mu_max_t0[k] * degraders[k] * KD0;
        }
        let cell_decay = DEAD_CELL_DECAY * dead_cells;

        let vfa = s.vfa_inhibition_load();
        let ki_carbon = table.ki_carbon();
        let ki_prot = table.ki_prot();
        let hydrolysis_carbo = s.carbo_is * params.k0_carbon * ki_carbon / (ki_carbon + vfa);
        let hydrolysis_prot = s.prot_is * params.k0_prot * ki_prot / (ki_prot + vfa);

        let mut z = DVector::zeros(REACTION_COUNT);
        z[0] = cell_decay;
        z[1] = hydrolysis_carbo;
        z[2] = hydrolysis_prot;
        for k in 0..DEGRADER_COUNT {
            z[3 + k] = mu[k] * degraders[k];
        }
        Self {
            mu,
            cell_death,
            cell_decay,
            hydrolysis_carbo,
            hydrolysis_prot,
            z,
        }
    }
}
