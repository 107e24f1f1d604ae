//! # Kinetic constants
//!
//! ## Purpose
//! Holds the kinetic constant table (`Const1`) and turns it into the
//! temperature-dependent growth parameters of one feed interval.
//!
//! ## Table layout
//! 10 rows, at least 11 columns. Rows 0 and 1 describe hydrolysis of
//! carbohydrates and proteins, rows 2..=9 the eight degrader populations
//! (carbohydrate, amino acid, lipid, LCFA, propionate, butyrate, valerate, acetate).
//!
//! | col | meaning |
//! |-----|---------|
//! | 0 | reference rate `mu_max_t0` |
//! | 1 | slope `alpha` |
//! | 2 | reference temperature `t0` |
//! | 3 | optimal temperature `t_opt` |
//! | 4 | maximum temperature `t_max` |
//! | 5 | half-saturation `Ks` |
//! | 6 | ammonia half-saturation `Ks_NH3` |
//! | 7 | row-specific inhibition constant |
//! | 8 | LCFA inhibition `Ki_LCFA` |
//! | 9 | `pK_low` |
//! | 10 | `pK_high` |
//!
//! ## Temperature dependence
//! ```text
//! T <  t_opt : mu_max_t0 + alpha*(T - t0)
//! T >= t_opt : (mu_max_t0 + alpha*(t_opt - t0)) * (t_max - T)/(t_max - t_opt)
//! ```
use crate::errors::ConfigError;
use nalgebra::DMatrix;

pub const KINETIC_TABLE_ROWS: usize = 10;
pub const KINETIC_TABLE_MIN_COLS: usize = 11;
pub const DEGRADER_COUNT: usize = 8;
/// first degrader row of the table
const DEGRADER_OFFSET: usize = 2;

/// One row of the kinetic constant table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KineticRow {
    pub reference_rate: f64,
    pub alpha: f64,
    pub t0: f64,
    pub t_opt: f64,
    pub t_max: f64,
    pub ks: f64,
    pub ks_nh3: f64,
    pub ki: f64,
    pub ki_lcfa: f64,
    pub pk_low: f64,
    pub pk_high: f64,
}

impl KineticRow {
    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            reference_rate: values[0],
            alpha: values[1],
            t0: values[2],
            t_opt: values[3],
            t_max: values[4],
            ks: values[5],
            ks_nh3: values[6],
            ki: values[7],
            ki_lcfa: values[8],
            pk_low: values[9],
            pk_high: values[10],
        }
    }

    fn as_array(&self) -> [f64; KINETIC_TABLE_MIN_COLS] {
        [
            self.reference_rate,
            self.alpha,
            self.t0,
            self.t_opt,
            self.t_max,
            self.ks,
            self.ks_nh3,
            self.ki,
            self.ki_lcfa,
            self.pk_low,
            self.pk_high,
        ]
    }

    /// Rejects rows whose temperature law would divide by zero or carry NaN.
    pub fn validate(&self, row: usize) -> Result<(), ConfigError> {
        if let Some(col) = self.as_array().iter().position(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidKineticTable(format!(
                "non-finite entry at row {}, column {}",
                row, col
            )));
        }
        if self.t_max == self.t_opt {
            return Err(ConfigError::InvalidKineticTable(format!(
                "row {}: t_max equals t_opt ({})",
                row, self.t_opt
            )));
        }
        Ok(())
    }

    /// Maximum specific rate at `temperature`.
    pub fn mu_max_at(&self, temperature: f64) -> f64 {
        if temperature < self.t_opt {
            self.reference_rate + self.alpha * (temperature - self.t0)
        } else {
            (self.reference_rate + self.alpha * (self.t_opt - self.t0))
                * (self.t_max - temperature)
                / (self.t_max - self.t_opt)
        }
    }
}

/// Validated kinetic constant table.
#[derive(Debug, Clone, PartialEq)]
pub struct KineticConstantTable {
    rows: Vec<KineticRow>,
}

impl KineticConstantTable {
    pub fn new(table: &DMatrix<f64>) -> Result<Self, ConfigError> {
        if table.nrows() != KINETIC_TABLE_ROWS || table.ncols() < KINETIC_TABLE_MIN_COLS {
            return Err(ConfigError::InvalidKineticTable(format!(
                "expected {} rows and at least {} columns, got {}x{}",
                KINETIC_TABLE_ROWS,
                KINETIC_TABLE_MIN_COLS,
                table.nrows(),
                table.ncols()
            )));
        }
        let rows: Vec<KineticRow> = (0..KINETIC_TABLE_ROWS)
            .map(|i| {
                let values: Vec<f64> = (0..KINETIC_TABLE_MIN_COLS).map(|j| table[(i, j)]).collect();
                KineticRow::from_slice(&values)
            })
            .collect();
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<KineticRow>) -> Result<Self, ConfigError> {
        if rows.len() != KINETIC_TABLE_ROWS {
            return Err(ConfigError::InvalidKineticTable(format!(
                "expected {} rows, got {}",
                KINETIC_TABLE_ROWS,
                rows.len()
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            row.validate(i)?;
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[KineticRow] {
        &self.rows
    }

    /// Row of degrader `k` (0..8).
    pub fn degrader(&self, k: usize) -> &KineticRow {
        &self.rows[DEGRADER_OFFSET + k]
    }

    pub fn ki_carbon(&self) -> f64 {
        self.rows[0].ki
    }
    pub fn ki_prot(&self) -> f64 {
        self.rows[1].ki
    }
    pub fn ki_hac_hpr(&self) -> f64 {
        self.rows[6].ki
    }
    pub fn ki_hac_hbut(&self) -> f64 {
        self.rows[7].ki
    }
    pub fn ki_hac_hval(&self) -> f64 {
        self.rows[8].ki
    }
    pub fn ki_nh3_hac(&self) -> f64 {
        self.rows[9].ki
    }
}

/// Growth parameters of one interval. Built once per interval, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureParameters {
    pub temperature: f64,
    pub mu_max: [f64; DEGRADER_COUNT],
    pub mu_max_t0: [f64; DEGRADER_COUNT],
    pub k0_carbon: f64,
    pub k0_prot: f64,
}

impl TemperatureParameters {
    pub fn compute(table: &KineticConstantTable, temperature: f64) -> Self {
        let mut mu_max = [0.0; DEGRADER_COUNT];
        let mut mu_max_t0 = [0.0; DEGRADER_COUNT];
        for k in 0..DEGRADER_COUNT {
            let row = table.degrader(k);
            mu_max[k] = row.mu_max_at(temperature);
            mu_max_t0[k] = row.reference_rate;
        }
        Self {
            temperature,
            mu_max,
            mu_max_t0,
            k0_carbon: table.rows()[0].mu_max_at(temperature),
            k0_prot: table.rows()[1].mu_max_at(temperature),
        }
    }
}
