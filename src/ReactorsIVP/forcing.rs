//! # Feed schedule
//!
//! Piecewise-constant forcing of the digester. Event `i` holds from the previous
//! timepoint (0 for the first event) up to its own `timepoint`.
//!
//! The raw feed table has rows `[t, T, Q_in, Q_out, c_1 .. c_28]` with daily flows;
//! they are converted to hourly rates and the inflow vector is `Q_in/24 * c`.
use crate::ReactorsIVP::state_vector::FEED_WIDTH;
use crate::errors::ConfigError;
use log::info;
use nalgebra::{DMatrix, DVector};

/// daily flows to hourly rates
pub const FLOW_DIVISOR: f64 = 24.0;
/// `t, T, Q_in, Q_out` precede the concentrations
pub const FEED_TABLE_COLS: usize = 4 + FEED_WIDTH;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub timepoint: f64,
    pub temperature: f64,
    pub flow_in: f64,
    pub flow_out: f64,
    /// mass inflow rates aligned with `y[1..=28]`
    pub inflow: DVector<f64>,
}

/// Validated, read-only list of feed events.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSchedule {
    events: Vec<FeedEvent>,
}

impl FeedSchedule {
    pub fn new(events: Vec<FeedEvent>) -> Result<Self, ConfigError> {
        let schedule = Self { events };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Build from the raw feed table.
    pub fn from_table(table: &DMatrix<f64>) -> Result<Self, ConfigError> {
        if table.ncols() != FEED_TABLE_COLS {
            return Err(ConfigError::InvalidSchedule(format!(
                "feed table needs {} columns, got {}",
                FEED_TABLE_COLS,
                table.ncols()
            )));
        }
        let events = table
            .row_iter()
            .map(|row| {
                let flow_in = row[2] / FLOW_DIVISOR;
                let flow_out = row[3] / FLOW_DIVISOR;
                let inflow = DVector::from_iterator(
                    FEED_WIDTH,
                    (4..FEED_TABLE_COLS).map(|j| flow_in * row[j]),
                );
                FeedEvent {
                    timepoint: row[0],
                    temperature: row[1],
                    flow_in,
                    flow_out,
                    inflow,
                }
            })
            .collect();
        let schedule = Self::new(events)?;
        info!(
            "feed schedule with {} events up to t = {}",
            schedule.len(),
            schedule.end_time()
        );
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut distinct: Vec<f64> = self.events.iter().map(|e| e.timepoint).collect();
        distinct.dedup();
        if distinct.len() < 2 {
            return Err(ConfigError::SingleDayFeed(distinct.len()));
        }
        let mut previous = 0.0;
        for (i, event) in self.events.iter().enumerate() {
            let scalars = [
                event.timepoint,
                event.temperature,
                event.flow_in,
                event.flow_out,
            ];
            if scalars.iter().chain(event.inflow.iter()).any(|v| !v.is_finite()) {
                return Err(ConfigError::InvalidSchedule(format!(
                    "event {} has a non-finite entry",
                    i
                )));
            }
            if event.inflow.len() != FEED_WIDTH {
                return Err(ConfigError::InvalidSchedule(format!(
                    "event {}: inflow has {} entries, expected {}",
                    i,
                    event.inflow.len(),
                    FEED_WIDTH
                )));
            }
            if event.flow_in < 0.0 || event.flow_out < 0.0 {
                return Err(ConfigError::InvalidSchedule(format!(
                    "event {}: negative flow",
                    i
                )));
            }
            if event.timepoint <= previous {
                let reason = if i == 0 {
                    format!("first timepoint must be positive, got {}", event.timepoint)
                } else {
                    format!(
                        "timepoints must increase: event {} at {} follows {}",
                        i, event.timepoint, previous
                    )
                };
                return Err(ConfigError::InvalidSchedule(reason));
            }
            previous = event.timepoint;
        }
        Ok(())
    }

    pub fn events(&self) -> &[FeedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn end_time(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.timepoint)
    }
}
