#[cfg(test)]
mod tests {
    use crate::Chemistry::acid_constants::HenryConstants;
    use crate::Chemistry::pH_equilibrium::{BrentDekker, PhMethod};
    use crate::Kinetics::kinetic_constants::TemperatureParameters;
    use crate::Numerical::stiff_ivp::SolverOptions;
    use crate::ReactorsIVP::forcing::{FeedEvent, FeedSchedule};
    use crate::ReactorsIVP::manager::{CancellationToken, DriverState, Manager, RunStatus};
    use crate::ReactorsIVP::state_vector::{CARBO_IN, FEED_WIDTH, GAS, INOCULUM_LEN, VOLUME};
    use crate::ReactorsIVP::test_data;
    use crate::errors::ConfigError;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn manager(schedule: FeedSchedule, ph_method: PhMethod, step_size: f64) -> Manager {
        Manager::new(
            test_data::kinetic_table(),
            test_data::acid_table(),
            test_data::yield_matrix(),
            schedule,
            test_data::initial_state(),
            ph_method,
            SolverOptions::default(),
            step_size,
        )
        .unwrap()
    }

    fn event(timepoint: f64, temperature: f64, flow_in: f64, flow_out: f64) -> FeedEvent {
        FeedEvent {
            timepoint,
            temperature,
            flow_in,
            flow_out,
            inflow: DVector::zeros(FEED_WIDTH),
        }
    }

    #[test]
    fn test_batch_run_emits_one_row_per_increment() {
        let mut m = manager(
            test_data::batch_schedule(&[1.0, 2.0], 35.0),
            PhMethod::default(),
            0.5,
        );
        assert_eq!(m.state(), DriverState::Idle);
        let result = m.run();
        assert_eq!(result.status, RunStatus::Completed);
        assert!(result.is_completed());
        assert_eq!(m.state(), DriverState::Done);

        let intervals: Vec<usize> = result.rows.iter().map(|r| r.interval).collect();
        assert_eq!(intervals, vec![0, 0, 1, 1]);
        let times: Vec<f64> = result.rows.iter().map(|r| r.t).collect();
        for (t, expected) in times.iter().zip([0.5, 1.0, 1.5, 2.0]) {
            assert_relative_eq!(*t, expected, epsilon = 1e-12);
        }
        for row in &result.rows {
            assert_relative_eq!(row.ph, 7.5);
            assert_relative_eq!(row.y[VOLUME], 3.0, epsilon = 1e-9);
            assert!(row.y.iter().all(|v| v.is_finite()));
        }
        // cumulative methane keeps growing across the interval boundary
        let methane: Vec<f64> = result.rows.iter().map(|r| r.y[GAS.start + 1]).collect();
        assert!(methane.windows(2).all(|w| w[1] > w[0]));
        assert!(methane[0] > 0.0);
        // growth rates of every row come from the accepted state
        for row in &result.rows {
            assert!(row.mu[7] > 0.0);
            assert!(row.mu.iter().all(|m| m.is_finite() && *m >= 0.0));
        }
    }

    #[test]
    fn test_interval_constants_are_recorded() {
        let schedule = FeedSchedule::new(vec![
            event(1.0, 35.0, 0.2, 0.0),
            event(2.0, 37.0, 0.0, 0.1),
        ])
        .unwrap();
        let mut m = manager(schedule, PhMethod::default(), 0.5);
        let result = m.run();
        assert!(result.is_completed());
        assert_eq!(result.intervals.len(), 2);
        let (kinetics, acids) = (test_data::kinetic_table(), test_data::acid_table());
        for (record, (t_start, t_end, temperature)) in result
            .intervals
            .iter()
            .zip([(0.0, 1.0, 35.0), (1.0, 2.0, 37.0)])
        {
            assert_eq!(record.t_start, t_start);
            assert_eq!(record.t_end, t_end);
            assert_eq!(record.rates, TemperatureParameters::compute(&kinetics, temperature));
            assert_eq!(record.henry, HenryConstants::compute(&acids, temperature));
        }
        assert_eq!(result.intervals[1].interval, 1);
        assert!(result.intervals[1].rates.mu_max[7] > result.intervals[0].rates.mu_max[7]);
    }

    #[test]
    fn test_last_increment_is_clipped_to_the_event() {
        let mut m = manager(
            test_data::batch_schedule(&[0.75, 1.5], 35.0),
            PhMethod::default(),
            0.5,
        );
        let result = m.run();
        assert!(result.is_completed());
        let times: Vec<f64> = result.rows.iter().map(|r| r.t).collect();
        assert_eq!(times.len(), 4);
        for (t, expected) in times.iter().zip([0.5, 0.75, 1.25, 1.5]) {
            assert_relative_eq!(*t, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_state_is_carried_across_intervals() {
        let schedule = FeedSchedule::new(vec![
            event(1.0, 35.0, 0.2, 0.0),
            event(2.0, 37.0, 0.0, 0.1),
        ])
        .unwrap();
        let mut m = manager(schedule, PhMethod::default(), 0.5);
        let result = m.run();
        assert!(result.is_completed());
        assert_relative_eq!(result.rows[1].y[VOLUME], 3.2, epsilon = 1e-8);
        assert_relative_eq!(result.rows[2].y[VOLUME], 3.15, epsilon = 1e-8);
        assert_relative_eq!(result.final_state().unwrap()[VOLUME], 3.1, epsilon = 1e-8);
        // inert carbohydrate is only diluted: V * c stays constant without inflow
        let inert = test_data::initial_state()[CARBO_IN] * 3.0 / 3.2;
        assert_relative_eq!(result.rows[1].y[CARBO_IN], inert, max_relative = 1e-3);
        // outflow alone leaves concentrations untouched
        assert_relative_eq!(result.rows[3].y[CARBO_IN], inert, max_relative = 1e-3);
    }

    #[test]
    fn test_cancelled_before_start_returns_no_rows() {
        let mut m = manager(
            test_data::batch_schedule(&[1.0, 2.0], 35.0),
            PhMethod::default(),
            0.5,
        );
        let token = CancellationToken::new();
        token.cancel();
        let result = m.run_with_cancellation(&token);
        assert_eq!(result.status, RunStatus::Cancelled { interval: 0 });
        assert!(result.rows.is_empty());
        assert!(result.intervals.is_empty());
        assert_eq!(m.state(), DriverState::Done);
    }

    #[test]
    fn test_cancellation_keeps_partial_rows() {
        let mut m = manager(
            test_data::batch_schedule(&[1.0, 2.0, 3.0], 35.0),
            PhMethod::default(),
            0.5,
        );
        let token = CancellationToken::new();
        let observer_token = token.clone();
        let result = m.run_observed(&token, |row| {
            if row.t >= 1.0 {
                observer_token.cancel();
            }
        });
        assert_eq!(result.status, RunStatus::Cancelled { interval: 1 });
        assert_eq!(result.rows.len(), 2);
        assert!(result.rows.iter().all(|r| r.interval == 0));
        assert_eq!(result.intervals.len(), 1);
    }

    #[test]
    fn test_equilibrium_failure_returns_failed_status() {
        let bad_bracket = PhMethod::BrentDekker(BrentDekker {
            lower: 1e-14,
            upper: 1e-13,
            ..BrentDekker::default()
        });
        let mut m = manager(test_data::batch_schedule(&[1.0, 2.0], 35.0), bad_bracket, 0.5);
        let result = m.run();
        match &result.status {
            RunStatus::Failed {
                interval,
                time,
                reason,
            } => {
                assert_eq!(*interval, 0);
                assert_eq!(*time, 0.0);
                assert!(reason.contains("bracket"), "{}", reason);
            }
            other => panic!("expected a failure, got {:?}", other),
        }
        assert!(result.rows.is_empty());
        assert!(result.final_state().is_none());
        // the constants of the failed interval survive
        assert_eq!(result.intervals.len(), 1);
        assert_eq!(
            result.intervals[0].henry,
            HenryConstants::compute(&test_data::acid_table(), 35.0)
        );
        assert_eq!(m.state(), DriverState::Done);
    }

    #[test]
    fn test_invalid_setup_is_rejected() {
        let build = |state: DVector<f64>, step: f64| {
            Manager::new(
                test_data::kinetic_table(),
                test_data::acid_table(),
                test_data::yield_matrix(),
                test_data::batch_schedule(&[1.0, 2.0], 35.0),
                state,
                PhMethod::default(),
                SolverOptions::default(),
                step,
            )
        };
        assert!(matches!(
            build(test_data::initial_state(), 0.0),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            build(test_data::initial_state(), f64::NAN),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            build(DVector::zeros(12), 0.5),
            Err(ConfigError::InvalidInitialState(_))
        ));
        let mut empty = test_data::initial_state();
        empty[VOLUME] = 0.0;
        assert!(matches!(
            build(empty, 0.5),
            Err(ConfigError::InvalidInitialState(_))
        ));
        // the inoculum without gas accumulators is padded
        let inoculum = test_data::initial_state().rows(0, INOCULUM_LEN).into_owned();
        assert!(build(inoculum, 0.5).is_ok());
    }
}
