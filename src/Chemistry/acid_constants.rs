//! # Acid and Henry constants
//!
//! Every row of the acid table is `[X0, T0, a, b, c]` and yields one temperature
//! corrected value
//! ```text
//! hc = X0 + dT*a + dT^2*b + dT^3*c,    dT = T - T0
//! ```
//! Rows 5, 7, 8 and 11 are Henry constants (NH3, CH4, CO2, H2S) used as is, the
//! remaining rows are pK values turned into `Ka = 10^-pK`.
use crate::errors::ConfigError;
use nalgebra::DMatrix;

pub const ACID_TABLE_MIN_ROWS: usize = 15;
pub const ACID_TABLE_MIN_COLS: usize = 5;
/// Acid table rows holding the Henry constants of NH3, CH4, CO2 and H2S.
pub const HENRY_ROWS: [usize; 4] = [5, 7, 8, 11];

/// Validated acid/Henry polynomial table.
#[derive(Debug, Clone, PartialEq)]
pub struct AcidConstantTable {
    pub table: DMatrix<f64>,
}

impl AcidConstantTable {
    pub fn new(table: DMatrix<f64>) -> Result<Self, ConfigError> {
        if table.nrows() < ACID_TABLE_MIN_ROWS || table.ncols() < ACID_TABLE_MIN_COLS {
            return Err(ConfigError::InvalidAcidTable(format!(
                "expected at least {}x{}, got {}x{}",
                ACID_TABLE_MIN_ROWS,
                ACID_TABLE_MIN_COLS,
                table.nrows(),
                table.ncols()
            )));
        }
        for i in 0..table.nrows() {
            for j in 0..ACID_TABLE_MIN_COLS {
                if !table[(i, j)].is_finite() {
                    return Err(ConfigError::InvalidAcidTable(format!(
                        "non-finite entry at row {}, column {}",
                        i, j
                    )));
                }
            }
        }
        Ok(Self { table })
    }

    /// Polynomial value of one row at `temperature`.
    pub fn value_at(&self, row: usize, temperature: f64) -> f64 {
        let t = &self.table;
        let dt = temperature - t[(row, 1)];
        t[(row, 0)] + dt * t[(row, 2)] + dt.powi(2) * t[(row, 3)] + dt.powi(3) * t[(row, 4)]
    }

    /// All row values at `temperature`.
    pub fn values_at(&self, temperature: f64) -> Vec<f64> {
        (0..self.table.nrows())
            .map(|row| self.value_at(row, temperature))
            .collect()
    }
}

/// Henry and dissociation constants of one interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HenryConstants {
    /// NH3, CH4, CO2, H2S
    pub k_h: [f64; 4],
    /// LCFA dissociation; only reported, LCFA stays out of the charge balance
    pub ka1_lcfa: f64,
    pub ka_nh4: f64,
    pub ka_hac: f64,
    pub ka_hpr: f64,
    pub ka_hbut: f64,
    pub ka_hval: f64,
    pub ka1_co2: f64,
    pub ka2_co2: f64,
    pub ka_h2s: f64,
    pub ka_h2po4: f64,
    pub kw: f64,
}

impl HenryConstants {
    pub fn compute(table: &AcidConstantTable, temperature: f64) -> Self {
        let hc = table.values_at(temperature);
        let ka = |row: usize| 10f64.powf(-hc[row]);
        Self {
            k_h: HENRY_ROWS.map(|row| hc[row]),
            ka1_lcfa: ka(0),
            ka_hac: ka(1),
            ka_hpr: ka(2),
            ka_hbut: ka(3),
            ka_hval: ka(4),
            ka_nh4: ka(6),
            ka1_co2: ka(9),
            ka2_co2: ka(10),
            ka_h2s: ka(12),
            ka_h2po4: ka(13),
            kw: ka(14),
        }
    }
}
