//! Small but complete digester data set shared by the unit tests.
use crate::Chemistry::acid_constants::AcidConstantTable;
use crate::Kinetics::growth::YieldMatrix;
use crate::Kinetics::kinetic_constants::KineticConstantTable;
use crate::ReactorsIVP::forcing::{FeedEvent, FeedSchedule};
use crate::ReactorsIVP::state_vector::{FEED_WIDTH, STATE_LEN};
use nalgebra::{DMatrix, DVector};

// reference rate, alpha, t0, t_opt, t_max, Ks, Ks_NH3, Ki, Ki_LCFA, pK_low, pK_high
pub const KINETIC_ROWS: [[f64; 11]; 10] = [
    [0.25, 0.01, 20.0, 40.0, 60.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0],
    [0.25, 0.01, 20.0, 40.0, 60.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0],
    [0.40, 0.015, 20.0, 40.0, 60.0, 0.5, 0.0001, 0.0, 5.0, 4.0, 9.0],
    [0.30, 0.01, 20.0, 40.0, 60.0, 0.3, 0.0001, 0.0, 5.0, 4.0, 9.0],
    [0.30, 0.01, 20.0, 40.0, 60.0, 0.4, 0.0001, 0.0, 5.0, 4.0, 9.0],
    [0.20, 0.01, 20.0, 40.0, 60.0, 0.4, 0.0001, 0.0, 5.0, 6.0, 9.0],
    [0.10, 0.005, 20.0, 40.0, 60.0, 0.259, 0.0001, 0.96, 5.0, 6.0, 9.0],
    [0.15, 0.005, 20.0, 40.0, 60.0, 0.176, 0.0001, 0.72, 5.0, 6.0, 9.0],
    [0.15, 0.005, 20.0, 40.0, 60.0, 0.175, 0.0001, 0.40, 5.0, 6.0, 9.0],
    [0.20, 0.008, 20.0, 40.0, 60.0, 0.12, 0.0001, 0.26, 5.0, 6.0, 9.0],
];

// X0, T0, a, b, c
pub const ACID_ROWS: [[f64; 5]; 15] = [
    [4.8, 25.0, 0.0, 0.0, 0.0],
    [4.76, 25.0, 0.0001, 0.0, 0.0],
    [4.88, 25.0, 0.0001, 0.0, 0.0],
    [4.82, 25.0, 0.0001, 0.0, 0.0],
    [4.84, 25.0, 0.0001, 0.0, 0.0],
    [57.0, 25.0, -0.8, 0.0, 0.0],
    [9.25, 25.0, -0.03, 0.0, 0.0],
    [0.0014, 25.0, 0.0, 0.0, 0.0],
    [0.034, 25.0, -0.0005, 0.0, 0.0],
    [6.35, 25.0, -0.005, 0.0, 0.0],
    [10.33, 25.0, -0.009, 0.0, 0.0],
    [0.1, 25.0, -0.001, 0.0, 0.0],
    [7.0, 25.0, -0.01, 0.0, 0.0],
    [7.2, 25.0, 0.001, 0.0, 0.0],
    [14.0, 25.0, -0.033, 0.0, 0.0],
];

// carbo_is carbo_in carbon lipids lcfa prot_is prot_in amino nh3 hac hpr hbut hval ch4 co2 h2s
pub const YIELD_ROWS: [[f64; 16]; 11] = [
    [0.5, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [-1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, -10.0, 0.0, 0.0, 0.0, 0.0, 0.0, -0.1, 5.0, 1.5, 1.2, 0.0, 0.0, 2.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -10.0, 1.0, 4.0, 1.0, 1.0, 1.0, 0.0, 1.5, 0.1],
    [0.0, 0.0, 0.0, -10.0, 9.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, -15.0, 0.0, 0.0, 0.0, 0.0, 12.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 15.0, -20.0, 0.0, 0.0, 0.0, 3.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 18.0, 0.0, -20.0, 0.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 8.0, 0.0, -20.0, 0.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -0.1, -30.0, 0.0, 0.0, 0.0, 8.0, 20.0, 0.0],
];

/// volume, 19 substrates, dead cells, 8 degraders
pub const INOCULUM: [f64; 29] = [
    3.0, // volume
    2.0, 0.5, 0.1, 0.5, 0.05, 1.0, 0.3, 0.1, 0.8, 0.3, 0.05, 0.05, 0.02, 0.001, 1.0, 0.01,
    1.5, 0.1, 0.6, // substrates
    0.1, // dead cells
    0.05, 0.05, 0.02, 0.01, 0.01, 0.01, 0.01, 0.03, // degraders
];

pub fn kinetic_matrix() -> DMatrix<f64> {
    let flat: Vec<f64> = KINETIC_ROWS.iter().flatten().copied().collect();
    DMatrix::from_row_slice(10, 11, &flat)
}

pub fn kinetic_table() -> KineticConstantTable {
    KineticConstantTable::new(&kinetic_matrix()).unwrap()
}

pub fn acid_table() -> AcidConstantTable {
    let flat: Vec<f64> = ACID_ROWS.iter().flatten().copied().collect();
    AcidConstantTable::new(DMatrix::from_row_slice(15, 5, &flat)).unwrap()
}

pub fn yield_matrix() -> YieldMatrix {
    let flat: Vec<f64> = YIELD_ROWS.iter().flatten().copied().collect();
    YieldMatrix::new(DMatrix::from_row_slice(11, 16, &flat)).unwrap()
}

/// Inoculum padded with empty gas accumulators.
pub fn initial_state() -> DVector<f64> {
    let mut y = DVector::zeros(STATE_LEN);
    for (i, v) in INOCULUM.iter().enumerate() {
        y[i] = *v;
    }
    y
}

/// Schedule without any flow: a closed batch reactor at `temperature`.
pub fn batch_schedule(timepoints: &[f64], temperature: f64) -> FeedSchedule {
    let events = timepoints
        .iter()
        .map(|&t| FeedEvent {
            timepoint: t,
            temperature,
            flow_in: 0.0,
            flow_out: 0.0,
            inflow: DVector::zeros(FEED_WIDTH),
        })
        .collect();
    FeedSchedule::new(events).unwrap()
}
