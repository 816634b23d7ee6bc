//! Closed-form power-law recession model `-dQ/dt = a·Q^b`.
//!
//! Forward solution from `Q(0) = Q0`:
//! - `b ≠ 1`: `Q(t) = (Q0^(1-b) + a(b-1)t)^(1/(1-b))`
//! - `b = 1`: `Q(t) = Q0·exp(-a t)`
//!
//! Characteristic timescale `τ = Q^(1-b)/a` (`1/a` for the linear reservoir).

use std::fmt;

use bf_core::{Error, Result};
use serde::Serialize;

use crate::linfit::{LineFit, wls};

/// `|b - 1|` below which the linear-reservoir (exponential) form is used.
pub const LINEAR_B_TOL: f64 = 1e-6;

#[inline]
fn is_linear(b: f64) -> bool {
    (b - 1.0).abs() < LINEAR_B_TOL
}

/// Drainage timescale `τ = Q^(1-b)/a`.
#[inline]
pub fn tau(q: f64, a: f64, b: f64) -> f64 {
    if is_linear(b) { 1.0 / a } else { q.powf(1.0 - b) / a }
}

/// Inverse of [`tau`]: the discharge whose timescale is `tau`.
///
/// Undefined (`NaN`) for the linear reservoir, where τ does not depend on Q.
#[inline]
pub fn q_from_tau(tau: f64, a: f64, b: f64) -> f64 {
    if is_linear(b) { f64::NAN } else { (a * tau).powf(1.0 / (1.0 - b)) }
}

/// Discharge after time `t` of a recession started at `q0`.
///
/// For `b < 1` the solution reaches zero in finite time and stays there.
pub fn q_nonlin(q0: f64, a: f64, b: f64, t: f64) -> f64 {
    if is_linear(b) {
        return q0 * (-a * t).exp();
    }
    let base = q0.powf(1.0 - b) + a * (b - 1.0) * t;
    if base <= 0.0 {
        return 0.0;
    }
    base.powf(1.0 / (1.0 - b))
}

/// Recession rate `-dQ/dt = a·Q^b` (positive for a falling limb).
#[inline]
pub fn recession_rate(q: f64, a: f64, b: f64) -> f64 {
    a * q.powf(b)
}

/// Intercept `a` implied by one `(q, dQ/dt)` pair at fixed exponent `b`.
#[inline]
pub fn a_from_point(q: f64, dqdt: f64, b: f64) -> f64 {
    -dqdt / q.powf(b)
}

/// Exponent `b` implied by a power-law tail `p(τ) ∝ τ^(-α)` of timescales.
///
/// With `τ = Q^(1-b)/a` and a discharge density that stays finite as
/// `Q → 0`, `P(τ > x) ∝ x^(-1/(b-1))`, hence `α = b/(b-1)`.
#[inline]
pub fn b_from_tail(alpha: f64) -> f64 {
    alpha / (alpha - 1.0)
}

/// Fitted power law with uncertainties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerLaw {
    /// Scale `a`.
    pub a: f64,
    /// Exponent `b`.
    pub b: f64,
    /// Standard error of `ln a`.
    pub ln_a_se: f64,
    /// Standard error of `b`.
    pub b_se: f64,
    /// r² of the log-log regression.
    pub rsq: f64,
    /// Points used.
    pub n: usize,
}

impl PowerLaw {
    /// Power law from a log-log line fit (`ln(-dQ/dt) = ln a + b ln q`).
    pub fn from_line(fit: &LineFit) -> Self {
        Self {
            a: fit.intercept.exp(),
            b: fit.slope,
            ln_a_se: fit.intercept_se,
            b_se: fit.slope_se,
            rsq: fit.rsq,
            n: fit.n,
        }
    }

    /// `-dQ/dt` at discharge `q`.
    pub fn rate(&self, q: f64) -> f64 {
        recession_rate(q, self.a, self.b)
    }

    /// τ at discharge `q`.
    pub fn tau(&self, q: f64) -> f64 {
        tau(q, self.a, self.b)
    }

    /// Discharge after `t` starting from `q0`.
    pub fn discharge_at(&self, q0: f64, t: f64) -> f64 {
        q_nonlin(q0, self.a, self.b, t)
    }
}

impl fmt::Display for PowerLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-dQ/dt = {:.3e} Q^{:.2}", self.a, self.b)
    }
}

/// Log-space power-law regression on `(q, dQ/dt)` pairs.
///
/// Only pairs with `q > 0` and `dQ/dt < 0` (finite) are used; fewer than
/// `min_points` usable pairs is [`Error::InsufficientData`].
pub fn fit_power_law(
    q: &[f64],
    dqdt: &[f64],
    weights: Option<&[f64]>,
    min_points: usize,
) -> Result<PowerLaw> {
    if q.len() != dqdt.len() || weights.is_some_and(|w| w.len() != q.len()) {
        return Err(Error::InvalidInput("power-law inputs differ in length".to_string()));
    }
    let mut x = Vec::with_capacity(q.len());
    let mut y = Vec::with_capacity(q.len());
    let mut w = Vec::with_capacity(q.len());
    for i in 0..q.len() {
        let wi = weights.map_or(1.0, |w| w[i]);
        if q[i].is_finite() && q[i] > 0.0 && dqdt[i].is_finite() && dqdt[i] < 0.0 && wi > 0.0 {
            x.push(q[i].ln());
            y.push((-dqdt[i]).ln());
            w.push(wi);
        }
    }
    if x.len() < min_points {
        return Err(Error::InsufficientData(format!(
            "power-law fit needs {min_points} usable points, got {}",
            x.len()
        )));
    }
    let fit = wls(&x, &y, Some(&w))?;
    Ok(PowerLaw::from_line(&fit))
}
