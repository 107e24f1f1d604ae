//! # Digester right-hand side
//!
//! ## Purpose
//! Assembles `dy/dt` of the 33-entry state for one feed interval:
//! 1. solve the charge balance for `H` (configured [`PhMethod`])
//! 2. evaluate growth, death, decay and hydrolysis rates
//! 3. map rates onto substrates with the yield matrix
//! 4. add dilution by the feed
//! 5. strip dissolved gases into the headspace accumulators
//!
//! ## Interval parameters
//! Everything that depends on the feed event (temperature-corrected rates, Henry
//! and acid constants, flows, inflow) is computed once into
//! [`IntervalParameters`] and stays frozen while the interval is integrated. The
//! derivative is a pure function of `(t, y, parameters)`.
use crate::Chemistry::acid_constants::{AcidConstantTable, HenryConstants};
use crate::Chemistry::pH_equilibrium::{ChargeBalance, Equilibrium, EquilibriumSolver, PhMethod};
use crate::Kinetics::growth::{ReactionRates, Substrates, YIELD_SUBSTRATES, YieldMatrix};
use crate::Kinetics::kinetic_constants::{KineticConstantTable, TemperatureParameters};
use crate::Numerical::stiff_ivp::OdeSystem;
use crate::ReactorsIVP::forcing::FeedEvent;
use crate::ReactorsIVP::state_vector::*;
use crate::errors::{DigesterError, ModelError};
use nalgebra::DVector;

/// Frozen parameters of one feed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalParameters {
    pub index: usize,
    pub rates: TemperatureParameters,
    pub henry: HenryConstants,
    pub flow_in: f64,
    pub flow_out: f64,
    pub inflow: DVector<f64>,
}

impl IntervalParameters {
    pub fn new(
        index: usize,
        event: &FeedEvent,
        kinetics: &KineticConstantTable,
        acids: &AcidConstantTable,
    ) -> Self {
        Self {
            index,
            rates: TemperatureParameters::compute(kinetics, event.temperature),
            henry: HenryConstants::compute(acids, event.temperature),
            flow_in: event.flow_in,
            flow_out: event.flow_out,
            inflow: event.inflow.clone(),
        }
    }
}

/// Snapshot of the charge-balance species in `y` with the interval constants.
pub fn charge_balance(y: &DVector<f64>, k: &HenryConstants) -> ChargeBalance {
    ChargeBalance {
        co2: y[CO2],
        hac: y[HAC],
        hpr: y[HPR],
        hbut: y[HBUT],
        hval: y[HVAL],
        nh3: y[NH3],
        a: y[A],
        z: y[Z],
        h2po4: y[H2PO4],
        ka1_co2: k.ka1_co2,
        ka2_co2: k.ka2_co2,
        ka_hac: k.ka_hac,
        ka_hpr: k.ka_hpr,
        ka_hbut: k.ka_hbut,
        ka_hval: k.ka_hval,
        ka_h2po4: k.ka_h2po4,
        ka_nh4: k.ka_nh4,
        kw: k.kw,
    }
}

/// The digester ODE of one interval.
#[derive(Debug, Clone)]
pub struct DigesterModel<'a> {
    pub kinetics: &'a KineticConstantTable,
    pub yields: &'a YieldMatrix,
    pub ph_method: &'a PhMethod,
    pub params: IntervalParameters,
}

impl<'a> DigesterModel<'a> {
    pub fn new(
        kinetics: &'a KineticConstantTable,
        yields: &'a YieldMatrix,
        ph_method: &'a PhMethod,
        params: IntervalParameters,
    ) -> Self {
        Self {
            kinetics,
            yields,
            ph_method,
            params,
        }
    }

    /// `dy/dt` together with the equilibrium it was evaluated at.
    pub fn derivative(
        &self,
        _t: f64,
        y: &DVector<f64>,
    ) -> Result<(DVector<f64>, Equilibrium), DigesterError> {
        if y.len() != STATE_LEN {
            return Err(ModelError::DimensionMismatch {
                expected: STATE_LEN,
                got: y.len(),
            }
            .into());
        }
        let p = &self.params;
        let volume = y[VOLUME];
        if !(volume > 0.0) {
            return Err(ModelError::NonPositiveVolume(volume).into());
        }

        let (equilibrium, rates) = self.diagnose(y)?;

        let mut y_dot = DVector::zeros(STATE_LEN);
        y_dot[VOLUME] = p.flow_in - p.flow_out;
        let production = self.yields.production(&rates.z);
        for i in 0..YIELD_SUBSTRATES {
            y_dot[SUBSTRATES.start + i] = production[i];
        }
        y_dot[DEAD_CELLS] = rates.cell_death.iter().sum::<f64>() - rates.cell_decay;
        for (k, idx) in DEGRADERS.enumerate() {
            y_dot[idx] = rates.z[3 + k] - rates.cell_death[k];
        }
        // dilution
        for i in 0..FEED_WIDTH {
            let idx = SUBSTRATES.start + i;
            y_dot[idx] += (p.inflow[i] - p.flow_in * y[idx]) / volume;
        }

        let flux = crate::ReactorsIVP::gas_transfer::gas_flux(
            y,
            &y_dot,
            equilibrium.h,
            volume,
            &p.henry,
        )?;
        flux.apply(&mut y_dot);

        if let Some(i) = y_dot.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite(format!("d{}/dt", STATE_HEADERS[i])).into());
        }
        Ok((y_dot, equilibrium))
    }

    /// Equilibrium and reaction rates of state `y` under this interval's constants.
    pub fn diagnose(
        &self,
        y: &DVector<f64>,
    ) -> Result<(Equilibrium, ReactionRates), DigesterError> {
        let p = &self.params;
        let equilibrium = self.ph_method.solve(&charge_balance(y, &p.henry))?;
        let substrates = Substrates::from_slice(&y.as_slice()[SUBSTRATES]);
        let rates = ReactionRates::evaluate(
            self.kinetics,
            &p.rates,
            &substrates,
            &y.as_slice()[DEGRADERS],
            y[DEAD_CELLS],
            &equilibrium,
            p.henry.ka_nh4,
        );
        Ok((equilibrium, rates))
    }
}

impl OdeSystem for DigesterModel<'_> {
    fn ndim(&self) -> usize {
        STATE_LEN
    }

    fn rhs(&self, t: f64, y: &DVector<f64>) -> Result<DVector<f64>, DigesterError> {
        self.derivative(t, y).map(|(y_dot, _)| y_dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chemistry::pH_equilibrium::{FixedPh, NewtonRaphson};
    use crate::ReactorsIVP::test_data;
    use approx::assert_relative_eq;

    fn closed_event(temperature: f64) -> FeedEvent {
        FeedEvent {
            timepoint: 24.0,
            temperature,
            flow_in: 0.0,
            flow_out: 0.0,
            inflow: DVector::zeros(FEED_WIDTH),
        }
    }

    #[test]
    fn test_closed_reactor_keeps_volume() {
        let kinetics = test_data::kinetic_table();
        let yields = test_data::yield_matrix();
        let ph = PhMethod::default();
        let params = IntervalParameters::new(0, &closed_event(35.0), &kinetics, &test_data::acid_table());
        let model = DigesterModel::new(&kinetics, &yields, &ph, params);
        let (y_dot, eq) = model.derivative(0.0, &test_data::initial_state()).unwrap();
        assert_eq!(y_dot[VOLUME], 0.0);
        assert_relative_eq!(eq.ph, 7.5);
        assert!(y_dot.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_zero_degraders_only_die() {
        let kinetics = test_data::kinetic_table();
        let yields = test_data::yield_matrix();
        let ph = PhMethod::Fixed(FixedPh { value: 7.5 });
        let params = IntervalParameters::new(0, &closed_event(35.0), &kinetics, &test_data::acid_table());
        let model = DigesterModel::new(&kinetics, &yields, &ph, params.clone());
        let mut y = test_data::initial_state();
        for idx in DEGRADERS {
            y[idx] = 0.0;
        }
        let (y_dot, eq) = model.derivative(0.0, &y).unwrap();
        let substrates = Substrates::from_slice(&y.as_slice()[SUBSTRATES]);
        let rates = ReactionRates::evaluate(
            &kinetics,
            &params.rates,
            &substrates,
            &y.as_slice()[DEGRADERS],
            y[DEAD_CELLS],
            &eq,
            params.henry.ka_nh4,
        );
        for (k, idx) in DEGRADERS.enumerate() {
            assert_eq!(rates.z[3 + k], 0.0);
            assert_eq!(y_dot[idx], -rates.cell_death[k]);
        }
    }

    #[test]
    fn test_dilution_with_feed() {
        let kinetics = test_data::kinetic_table();
        let yields = test_data::yield_matrix();
        let ph = PhMethod::default();
        let acids = test_data::acid_table();
        let closed = IntervalParameters::new(0, &closed_event(35.0), &kinetics, &acids);
        let mut fed_event = closed_event(35.0);
        fed_event.flow_in = 0.5;
        fed_event.flow_out = 0.25;
        fed_event.inflow[CARBO_IN - 1] = 0.5 * 4.0;
        let fed = IntervalParameters::new(0, &fed_event, &kinetics, &acids);
        let y = test_data::initial_state();
        let (dy_closed, _) = DigesterModel::new(&kinetics, &yields, &ph, closed)
            .derivative(0.0, &y)
            .unwrap();
        let (dy_fed, _) = DigesterModel::new(&kinetics, &yields, &ph, fed)
            .derivative(0.0, &y)
            .unwrap();
        assert_relative_eq!(dy_fed[VOLUME], 0.25);
        // inert carbohydrate is untouched by the biology, only diluted
        assert_relative_eq!(
            dy_fed[CARBO_IN] - dy_closed[CARBO_IN],
            (2.0 - 0.5 * y[CARBO_IN]) / y[VOLUME],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rejects_bad_state() {
        let kinetics = test_data::kinetic_table();
        let yields = test_data::yield_matrix();
        let ph = PhMethod::default();
        let params = IntervalParameters::new(0, &closed_event(35.0), &kinetics, &test_data::acid_table());
        let model = DigesterModel::new(&kinetics, &yields, &ph, params);
        let short = DVector::zeros(10);
        assert!(matches!(
            model.derivative(0.0, &short),
            Err(DigesterError::Model(ModelError::DimensionMismatch { .. }))
        ));
        let mut empty = test_data::initial_state();
        empty[VOLUME] = 0.0;
        assert!(matches!(
            model.derivative(0.0, &empty),
            Err(DigesterError::Model(ModelError::NonPositiveVolume(_)))
        ));
    }

    #[test]
    fn test_solved_ph_is_self_consistent() {
        let kinetics = test_data::kinetic_table();
        let yields = test_data::yield_matrix();
        let ph = PhMethod::NewtonRaphson(NewtonRaphson::default());
        let acids = test_data::acid_table();
        let params = IntervalParameters::new(0, &closed_event(35.0), &kinetics, &acids);
        let balance = charge_balance(&test_data::initial_state(), &params.henry);
        let model = DigesterModel::new(&kinetics, &yields, &ph, params);
        let (_, eq) = model.derivative(0.0, &test_data::initial_state()).unwrap();
        assert!((balance.residual(eq.h) - eq.h).abs() < 1e-10);
    }
}
