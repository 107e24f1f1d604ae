//! # pH Equilibrium Module
//!
//! ## Purpose
//! Finds the hydrogen-ion concentration `H` that closes the charge balance of the
//! reactor liquid for a frozen snapshot of weak acids, weak bases and strong ions.
//! The digester model calls it once per derivative evaluation, so every method here
//! is allocation free and bounded.
//!
//! ## Charge balance
//! Mass concentrations are divided by their molar masses to get molar equivalents:
//! ```text
//! F(H) = CO2/44 * Ka1*(H+2*Ka2)/(H*(H+Ka1)+Ka1*Ka2)
//!      + HAc/60*KaHAc/(H+KaHAc) + HPr/74*KaHPr/(H+KaHPr)
//!      + HBut/88*KaHBut/(H+KaHBut) + HVal/102*KaHVal/(H+KaHVal)
//!      + A/35.5 + H2PO4/31*(H+2*KaH2PO4)/(H+KaH2PO4)
//!      - NH3/14*H/(H+KaNH4) - Z/39 + Kw/H
//! ```
//! The equilibrium is the fixed point `F(H) = H`. `G(H) = H - F(H)` is strictly
//! increasing in `H`, so a positive root is unique.
//!
//! ## Methods
//! - [`NewtonRaphson`]: fixed-point Newton, fast for well conditioned snapshots
//! - [`BrentDekker`]: bracketing, needs a sign change across `(lower, upper)`
//! - [`Secant`]: derivative-free quasi-Newton from a single guess
//! - [`FixedPh`]: no computation, returns a configured pH
//!
//! All of them are dispatched through [`EquilibriumSolver`] on the [`PhMethod`] enum.
use crate::errors::EquilibriumError;
use enum_dispatch::enum_dispatch;

/// Snapshot of the species taking part in the charge balance (g/L) together
/// with their dissociation constants for the current interval temperature.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChargeBalance {
    pub co2: f64,
    pub hac: f64,
    pub hpr: f64,
    pub hbut: f64,
    pub hval: f64,
    pub nh3: f64,
    pub a: f64,
    pub z: f64,
    pub h2po4: f64,
    pub ka1_co2: f64,
    pub ka2_co2: f64,
    pub ka_hac: f64,
    pub ka_hpr: f64,
    pub ka_hbut: f64,
    pub ka_hval: f64,
    pub ka_h2po4: f64,
    pub ka_nh4: f64,
    pub kw: f64,
}

impl ChargeBalance {
    /// F(H)
    pub fn residual(&self, h: f64) -> f64 {
        let carbonate_den = h * (h + self.ka1_co2) + self.ka1_co2 * self.ka2_co2;
        self.co2 / 44.0 * self.ka1_co2 * (h + 2.0 * self.ka2_co2) / carbonate_den
            + self.hac / 60.0 * self.ka_hac / (h + self.ka_hac)
            + self.hpr / 74.0 * self.ka_hpr / (h + self.ka_hpr)
            + self.hbut / 88.0 * self.ka_hbut / (h + self.ka_hbut)
            + self.hval / 102.0 * self.ka_hval / (h + self.ka_hval)
            + self.a / 35.5
            + self.h2po4 / 31.0 * (h + 2.0 * self.ka_h2po4) / (h + self.ka_h2po4)
            - self.nh3 / 14.0 * h / (h + self.ka_nh4)
            - self.z / 39.0
            + self.kw / h
    }

    /// dF/dH
    pub fn residual_derivative(&self, h: f64) -> f64 {
        let carbonate_den = h * (h + self.ka1_co2) + self.ka1_co2 * self.ka2_co2;
        -self.co2 / 44.0 * self.ka1_co2 * (h * (h + 4.0 * self.ka2_co2)
            + self.ka1_co2 * self.ka2_co2)
            / carbonate_den.powi(2)
            - self.hac / 60.0 * self.ka_hac / (h + self.ka_hac).powi(2)
            - self.hpr / 74.0 * self.ka_hpr / (h + self.ka_hpr).powi(2)
            - self.hbut / 88.0 * self.ka_hbut / (h + self.ka_hbut).powi(2)
            - self.hval / 102.0 * self.ka_hval / (h + self.ka_hval).powi(2)
            - self.kw / (h * h)
            - self.h2po4 / 31.0 * self.ka_h2po4 / (h + self.ka_h2po4).powi(2)
            - self.nh3 / 14.0 * self.ka_nh4 / (h + self.ka_nh4).powi(2)
    }

    /// G(H) = H - F(H); zero at equilibrium.
    pub fn fixed_point_gap(&self, h: f64) -> f64 {
        h - self.residual(h)
    }
}

/// Solved equilibrium: hydrogen-ion concentration and the matching pH.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equilibrium {
    pub h: f64,
    pub ph: f64,
}

impl Equilibrium {
    pub fn from_h(h: f64) -> Self {
        Self { h, ph: -h.log10() }
    }

    pub fn from_ph(ph: f64) -> Self {
        Self {
            h: 10f64.powf(-ph),
            ph,
        }
    }
}

#[enum_dispatch]
pub trait EquilibriumSolver {
    /// Solve the charge balance for `H`.
    fn solve(&self, balance: &ChargeBalance) -> Result<Equilibrium, EquilibriumError>;
    /// Name used in configuration files and logs.
    fn method_name(&self) -> &'static str;
}

/// Newton iteration on the fixed point `F(H) = H`:
/// `H <- H - (F(H) - H) / (F'(H) - 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonRaphson {
    pub initial_guess: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        Self {
            initial_guess: 1e-8,
            tolerance: 1e-12,
            max_iterations: 100,
        }
    }
}

impl EquilibriumSolver for NewtonRaphson {
    fn solve(&self, balance: &ChargeBalance) -> Result<Equilibrium, EquilibriumError> {
        let mut h = self.initial_guess;
        let mut gap = f64::INFINITY;
        for _ in 0..self.max_iterations {
            let f = balance.residual(h);
            gap = f - h;
            if !gap.is_finite() {
                return Err(EquilibriumError::InvalidHydrogen(h));
            }
            if gap.abs() < self.tolerance {
                return Ok(Equilibrium::from_h(h));
            }
            let df = balance.residual_derivative(h);
            let mut next = h - gap / (df - 1.0);
            if next <= 0.0 {
                next = h / 10.0;
            }
            if !next.is_finite() {
                return Err(EquilibriumError::InvalidHydrogen(next));
            }
            h = next;
        }
        Err(EquilibriumError::NonConvergence {
            iterations: self.max_iterations,
            residual: gap.abs(),
        })
    }

    fn method_name(&self) -> &'static str {
        "newton-raphson"
    }
}

/// Brent-Dekker bracketing on `G(H) = H - F(H)` over `(lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrentDekker {
    pub lower: f64,
    pub upper: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for BrentDekker {
    fn default() -> Self {
        Self {
            lower: 1e-10,
            upper: 1e-4,
            tolerance: 1e-14,
            max_iterations: 200,
        }
    }
}

impl EquilibriumSolver for BrentDekker {
    fn solve(&self, balance: &ChargeBalance) -> Result<Equilibrium, EquilibriumError> {
        let g = |h: f64| balance.fixed_point_gap(h);
        let rtol = 4.0 * f64::EPSILON;

        let mut xpre = self.lower;
        let mut xcur = self.upper;
        let mut fpre = g(xpre);
        let mut fcur = g(xcur);
        if !fpre.is_finite() || !fcur.is_finite() {
            return Err(EquilibriumError::InvalidHydrogen(if fpre.is_finite() {
                xcur
            } else {
                xpre
            }));
        }
        if fpre * fcur > 0.0 {
            return Err(EquilibriumError::InvalidBracket {
                lower: self.lower,
                upper: self.upper,
                f_lower: fpre,
                f_upper: fcur,
            });
        }
        if fpre == 0.0 {
            return Ok(Equilibrium::from_h(xpre));
        }
        if fcur == 0.0 {
            return Ok(Equilibrium::from_h(xcur));
        }

        let (mut xblk, mut fblk) = (0.0, 0.0);
        let (mut spre, mut scur) = (0.0, 0.0);
        for _ in 0..self.max_iterations {
            if fpre != 0.0 && fcur != 0.0 && fpre.is_sign_negative() != fcur.is_sign_negative() {
                xblk = xpre;
                fblk = fpre;
                spre = xcur - xpre;
                scur = spre;
            }
            if fblk.abs() < fcur.abs() {
                xpre = xcur;
                xcur = xblk;
                xblk = xpre;
                fpre = fcur;
                fcur = fblk;
                fblk = fpre;
            }

            let delta = (self.tolerance + rtol * xcur.abs()) / 2.0;
            let sbis = (xblk - xcur) / 2.0;
            if fcur == 0.0 || sbis.abs() < delta {
                return Ok(Equilibrium::from_h(xcur));
            }

            if spre.abs() > delta && fcur.abs() < fpre.abs() {
                let stry = if xpre == xblk {
                    // secant
                    -fcur * (xcur - xpre) / (fcur - fpre)
                } else {
                    // inverse quadratic interpolation
                    let dpre = (fpre - fcur) / (xpre - xcur);
                    let dblk = (fblk - fcur) / (xblk - xcur);
                    -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
                };
                if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                    spre = scur;
                    scur = stry;
                } else {
                    spre = sbis;
                    scur = sbis;
                }
            } else {
                spre = sbis;
                scur = sbis;
            }

            xpre = xcur;
            fpre = fcur;
            if scur.abs() > delta {
                xcur += scur;
            } else {
                xcur += if sbis > 0.0 { delta } else { -delta };
            }
            fcur = g(xcur);
        }
        Err(EquilibriumError::NonConvergence {
            iterations: self.max_iterations,
            residual: fcur.abs(),
        })
    }

    fn method_name(&self) -> &'static str {
        "brent-dekker"
    }
}

/// Secant iteration on `G(H)`; no derivative needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Secant {
    pub initial_guess: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for Secant {
    fn default() -> Self {
        Self {
            initial_guess: 1e-8,
            tolerance: 1e-12,
            max_iterations: 100,
        }
    }
}

impl EquilibriumSolver for Secant {
    fn solve(&self, balance: &ChargeBalance) -> Result<Equilibrium, EquilibriumError> {
        let mut x0 = self.initial_guess;
        let mut x1 = self.initial_guess * 1.001;
        let mut g0 = balance.fixed_point_gap(x0);
        let mut g1 = balance.fixed_point_gap(x1);
        for _ in 0..self.max_iterations {
            if !g1.is_finite() {
                return Err(EquilibriumError::InvalidHydrogen(x1));
            }
            if g1.abs() < self.tolerance {
                return Ok(Equilibrium::from_h(x1));
            }
            if g1 == g0 {
                break;
            }
            let mut x2 = x1 - g1 * (x1 - x0) / (g1 - g0);
            if x2 <= 0.0 {
                x2 = x1 / 10.0;
            }
            x0 = x1;
            g0 = g1;
            x1 = x2;
            g1 = balance.fixed_point_gap(x1);
        }
        Err(EquilibriumError::NonConvergence {
            iterations: self.max_iterations,
            residual: g1.abs(),
        })
    }

    fn method_name(&self) -> &'static str {
        "secant"
    }
}

/// Bypasses the charge balance and reports a configured pH.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPh {
    pub value: f64,
}

impl Default for FixedPh {
    fn default() -> Self {
        Self { value: 7.5 }
    }
}

impl EquilibriumSolver for FixedPh {
    fn solve(&self, _balance: &ChargeBalance) -> Result<Equilibrium, EquilibriumError> {
        Ok(Equilibrium::from_ph(self.value))
    }

    fn method_name(&self) -> &'static str {
        "fixed"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[enum_dispatch(EquilibriumSolver)]
pub enum PhMethod {
    NewtonRaphson(NewtonRaphson),
    BrentDekker(BrentDekker),
    Secant(Secant),
    Fixed(FixedPh),
}

impl Default for PhMethod {
    fn default() -> Self {
        PhMethod::Fixed(FixedPh::default())
    }
}
