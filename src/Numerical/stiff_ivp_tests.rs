#[cfg(test)]
mod tests {
    use crate::Numerical::stiff_ivp::*;
    use crate::errors::{ConfigError, DigesterError, IntegratorError, ModelError};
    use approx::assert_relative_eq;
    use nalgebra::{DVector, dvector};

    struct LinearDecay {
        k: f64,
    }

    impl OdeSystem for LinearDecay {
        fn ndim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, DigesterError> {
            Ok(y * (-self.k))
        }
    }

    /// y1' = -0.04 y1 + 1e4 y2 y3, y2' = 0.04 y1 - 1e4 y2 y3 - 3e7 y2^2, y3' = 3e7 y2^2
    struct Robertson;

    impl OdeSystem for Robertson {
        fn ndim(&self) -> usize {
            3
        }
        fn rhs(&self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, DigesterError> {
            let r1 = 0.04 * y[0];
            let r2 = 1e4 * y[1] * y[2];
            let r3 = 3e7 * y[1] * y[1];
            Ok(dvector![-r1 + r2, r1 - r2 - r3, r3])
        }
    }

    struct Exploding;

    impl OdeSystem for Exploding {
        fn ndim(&self) -> usize {
            1
        }
        fn rhs(&self, t: f64, y: &DVector<f64>) -> Result<DVector<f64>, DigesterError> {
            if t > 0.5 {
                return Err(ModelError::NonFinite("test derivative".to_string()).into());
            }
            Ok(y.clone())
        }
    }

    fn options(method: SolverMethod, rtol: f64, atol: f64) -> SolverOptions {
        SolverOptions {
            method,
            rtol,
            atol,
            nsteps: 5000,
            ..SolverOptions::default()
        }
    }

    #[test]
    fn test_stiff_linear_decay() {
        let mut solver =
            StiffIntegrator::new(options(SolverMethod::Bdf { order: 2 }, 1e-4, 1e-8)).unwrap();
        solver.reset(0.0, dvector![1.0]);
        let system = LinearDecay { k: 1000.0 };
        let y = solver.advance_to(&system, 0.005).unwrap()[0];
        assert_relative_eq!(y, (-5.0f64).exp(), max_relative = 2e-2);
        let y = solver.advance_to(&system, 1.0).unwrap()[0];
        assert!(y.abs() < 1e-8);
        assert_eq!(solver.t(), 1.0);
        // steps grow once the transient has decayed
        assert!(solver.stats.accepted_steps < 400);
    }

    #[test]
    fn test_mild_decay_accuracy_all_methods() {
        for method in [
            SolverMethod::Bdf { order: 2 },
            SolverMethod::Bdf { order: 1 },
            SolverMethod::BackwardEuler,
        ] {
            let mut solver = StiffIntegrator::new(options(method, 1e-6, 1e-10)).unwrap();
            solver.reset(0.0, dvector![1.0]);
            let y = solver.advance_to(&LinearDecay { k: 1.0 }, 1.0).unwrap()[0];
            assert_relative_eq!(y, (-1.0f64).exp(), max_relative = 2e-3);
        }
    }

    #[test]
    fn test_robertson_conserves_mass() {
        let mut solver =
            StiffIntegrator::new(options(SolverMethod::Bdf { order: 2 }, 1e-5, 1e-10)).unwrap();
        solver.reset(0.0, dvector![1.0, 0.0, 0.0]);
        let y = solver.advance_to(&Robertson, 40.0).unwrap().clone();
        assert_relative_eq!(y.sum(), 1.0, epsilon = 1e-6);
        // reference value y1(40) = 0.7158
        assert_relative_eq!(y[0], 0.7158, epsilon = 5e-3);
    }

    #[test]
    fn test_reset_discards_history() {
        let mut solver = StiffIntegrator::new(SolverOptions::default()).unwrap();
        let system = LinearDecay { k: 2.0 };
        solver.reset(0.0, dvector![1.0]);
        solver.advance_to(&system, 1.0).unwrap();
        assert!(solver.stats.accepted_steps > 0);
        solver.reset(5.0, dvector![3.0]);
        assert_eq!(solver.stats, IntegratorStats::default());
        assert_eq!(solver.t(), 5.0);
        assert_eq!(solver.y()[0], 3.0);
        let y = solver.advance_to(&system, 5.5).unwrap()[0];
        assert_relative_eq!(y, 3.0 * (-1.0f64).exp(), max_relative = 1e-2);
    }

    #[test]
    fn test_step_limit() {
        let mut opts = options(SolverMethod::Bdf { order: 2 }, 1e-10, 1e-14);
        opts.nsteps = 3;
        opts.first_step = Some(1e-6);
        let mut solver = StiffIntegrator::new(opts).unwrap();
        solver.reset(0.0, dvector![1.0]);
        match solver.advance_to(&LinearDecay { k: 1.0 }, 10.0) {
            Err(DigesterError::Integrator(IntegratorError::TooManySteps(3))) => {}
            other => panic!("expected TooManySteps, got {:?}", other),
        }
    }

    #[test]
    fn test_rhs_failure_is_reported() {
        let mut solver = StiffIntegrator::new(SolverOptions::default()).unwrap();
        solver.reset(0.0, dvector![1.0]);
        let result = solver.advance_to(&Exploding, 1.0);
        assert!(matches!(result, Err(DigesterError::Model(ModelError::NonFinite(_)))));
        assert!(solver.t() <= 0.5);
    }

    #[test]
    fn test_invalid_options() {
        let bad_tol = SolverOptions {
            rtol: 0.0,
            ..SolverOptions::default()
        };
        assert!(matches!(
            StiffIntegrator::new(bad_tol),
            Err(ConfigError::InvalidValue { .. })
        ));
        let bad_order = SolverOptions {
            method: SolverMethod::Bdf { order: 5 },
            ..SolverOptions::default()
        };
        assert!(StiffIntegrator::new(bad_order).is_err());
    }
}
