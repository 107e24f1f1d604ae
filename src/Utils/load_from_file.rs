//! # Input tables
//!
//! Loaders for the numeric text tables of a digester run. Every file is plain
//! text with whitespace-separated numbers, one table row per line; `%` starts a
//! comment that runs to the end of the line and blank lines are skipped.
//!
//! | file | content |
//! |------|---------|
//! | `Const1.constant` | kinetic constants, 10 rows x 11+ columns |
//! | `Const2.constant` | acid/Henry temperature polynomials, 15+ rows x 5+ columns |
//! | `yieldc.constant` | yield coefficients, 11 x 16 |
//! | `feed.constant` | feed schedule `[t, T, Q_in, Q_out, c_1 .. c_28]` per row |
//! | `inoculum.constant` | initial state without gas accumulators, 29 values |
use crate::Chemistry::acid_constants::AcidConstantTable;
use crate::Kinetics::growth::YieldMatrix;
use crate::Kinetics::kinetic_constants::KineticConstantTable;
use crate::ReactorsIVP::forcing::FeedSchedule;
use crate::ReactorsIVP::state_vector::{INOCULUM_LEN, STATE_LEN};
use crate::errors::{ConfigError, DigesterError};
use log::{error, info};
use nalgebra::{DMatrix, DVector};
use std::fs;
use std::path::Path;

pub const KINETICS_FILE: &str = "Const1.constant";
pub const ACIDS_FILE: &str = "Const2.constant";
pub const YIELDS_FILE: &str = "yieldc.constant";
pub const FEED_FILE: &str = "feed.constant";
pub const INOCULUM_FILE: &str = "inoculum.constant";

/// Parse a numeric table. `file` is only used in error messages.
pub fn parse_table(text: &str, file: &str) -> Result<DMatrix<f64>, DigesterError> {
    let mut values: Vec<f64> = Vec::new();
    let mut width: Option<usize> = None;
    let mut nrows = 0;
    for (i, line) in text.lines().enumerate() {
        let data = line.split('%').next().unwrap_or("").trim();
        if data.is_empty() {
            continue;
        }
        let row = data
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|e| DigesterError::Parse {
                    file: file.to_string(),
                    line: i + 1,
                    message: format!("'{}': {}", token, e),
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(DigesterError::Parse {
                    file: file.to_string(),
                    line: i + 1,
                    message: format!("expected {} columns, found {}", w, row.len()),
                });
            }
            Some(_) => {}
        }
        values.extend(row);
        nrows += 1;
    }
    let ncols = width.ok_or_else(|| DigesterError::Parse {
        file: file.to_string(),
        line: 0,
        message: "no numeric data".to_string(),
    })?;
    Ok(DMatrix::from_row_slice(nrows, ncols, &values))
}

/// Read and parse one table file.
pub fn load_table(path: &Path) -> Result<DMatrix<f64>, DigesterError> {
    if !path.exists() {
        error!("file '{}' does not exist", path.display());
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file '{}' does not exist", path.display()),
        )
        .into());
    }
    let text = fs::read_to_string(path)?;
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let table = parse_table(&text, &file).inspect_err(|e| error!("{}", e))?;
    info!(
        "loaded '{}': {} x {}",
        file,
        table.nrows(),
        table.ncols()
    );
    Ok(table)
}

/// Initial state from the inoculum table: its 29 values in reading order,
/// extended by four empty gas accumulators.
pub fn inoculum_state(table: &DMatrix<f64>) -> Result<DVector<f64>, ConfigError> {
    if table.len() != INOCULUM_LEN {
        return Err(ConfigError::InvalidInitialState(format!(
            "inoculum needs {} values, got {}",
            INOCULUM_LEN,
            table.len()
        )));
    }
    // DMatrix is column-major; read the file row by row
    let values = table.transpose();
    let mut state = DVector::zeros(STATE_LEN);
    for (i, v) in values.iter().enumerate() {
        state[i] = *v;
    }
    Ok(state)
}

/// Everything a [`crate::ReactorsIVP::manager::Manager`] needs besides the settings.
#[derive(Debug, Clone)]
pub struct InputData {
    pub kinetics: KineticConstantTable,
    pub acids: AcidConstantTable,
    pub yields: YieldMatrix,
    pub schedule: FeedSchedule,
    /// full 33-entry initial state
    pub inoculum: DVector<f64>,
}

impl InputData {
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, DigesterError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            error!("input folder '{}' does not exist", dir.display());
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input folder '{}' does not exist", dir.display()),
            )
            .into());
        }
        let kinetics = KineticConstantTable::new(&load_table(&dir.join(KINETICS_FILE))?)?;
        let acids = AcidConstantTable::new(load_table(&dir.join(ACIDS_FILE))?)?;
        let yields = YieldMatrix::new(load_table(&dir.join(YIELDS_FILE))?)?;
        let schedule = FeedSchedule::from_table(&load_table(&dir.join(FEED_FILE))?)?;
        let inoculum = inoculum_state(&load_table(&dir.join(INOCULUM_FILE))?)?;
        info!("input data loaded from '{}'", dir.display());
        Ok(Self {
            kinetics,
            acids,
            yields,
            schedule,
            inoculum,
        })
    }
}
