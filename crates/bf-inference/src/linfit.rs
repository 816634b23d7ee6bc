//! Straight-line least squares.
//!
//! `ols` is the closed-form fit used inside every sliding window of the
//! exponential time-step method; `wls` solves the weighted normal equations
//! (nalgebra) and carries standard errors for the power-law regressions.

use bf_core::{Error, Result};
use nalgebra::{Matrix2, Vector2};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Fitted line `y = intercept + slope·x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    /// Slope.
    pub slope: f64,
    /// Intercept.
    pub intercept: f64,
    /// Coefficient of determination (weighted when weights were given).
    pub rsq: f64,
    /// Standard error of the slope (`NaN` with fewer than 3 points).
    pub slope_se: f64,
    /// Standard error of the intercept (`NaN` with fewer than 3 points).
    pub intercept_se: f64,
    /// Number of points used.
    pub n: usize,
}

impl LineFit {
    /// Two-sided Student-t interval for the slope at `conf_level`.
    ///
    /// Degenerates to `(slope, slope)` when the standard error is unavailable.
    pub fn slope_interval(&self, conf_level: f64) -> (f64, f64) {
        let half = t_quantile(self.n, conf_level) * self.slope_se;
        if half.is_finite() { (self.slope - half, self.slope + half) } else { (self.slope, self.slope) }
    }
}

fn t_quantile(n: usize, conf_level: f64) -> f64 {
    if n < 3 {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, (n - 2) as f64) {
        Ok(t) => t.inverse_cdf(0.5 + 0.5 * conf_level),
        Err(_) => f64::NAN,
    }
}

/// Ordinary least squares on paired finite samples.
pub fn ols(x: &[f64], y: &[f64]) -> Result<LineFit> {
    wls(x, y, None)
}

/// Weighted least squares; `weights = None` means unit weights.
///
/// Pairs with a non-finite coordinate or a non-positive/non-finite weight are
/// skipped.
pub fn wls(x: &[f64], y: &[f64], weights: Option<&[f64]>) -> Result<LineFit> {
    if x.len() != y.len() || weights.is_some_and(|w| w.len() != x.len()) {
        return Err(Error::InvalidInput(format!(
            "regression inputs differ in length: x={}, y={}, w={:?}",
            x.len(),
            y.len(),
            weights.map(|w| w.len())
        )));
    }

    let mut xtwx = Matrix2::<f64>::zeros();
    let mut xtwy = Vector2::<f64>::zeros();
    let mut sw = 0.0;
    let mut swy = 0.0;
    let mut n = 0usize;
    for i in 0..x.len() {
        let w = weights.map_or(1.0, |w| w[i]);
        if !(x[i].is_finite() && y[i].is_finite() && w.is_finite() && w > 0.0) {
            continue;
        }
        let row = Vector2::new(1.0, x[i]);
        xtwx += w * row * row.transpose();
        xtwy += w * y[i] * row;
        sw += w;
        swy += w * y[i];
        n += 1;
    }
    if n < 2 {
        return Err(Error::InsufficientData(format!("line fit needs >= 2 points, got {n}")));
    }

    let inv = xtwx.try_inverse().ok_or_else(|| {
        Error::DegenerateFit("line fit: x has no spread (singular normal equations)".to_string())
    })?;
    let beta = inv * xtwy;
    let (intercept, slope) = (beta[0], beta[1]);
    if !(intercept.is_finite() && slope.is_finite()) {
        return Err(Error::DegenerateFit("line fit produced non-finite coefficients".to_string()));
    }

    let ybar = swy / sw;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for i in 0..x.len() {
        let w = weights.map_or(1.0, |w| w[i]);
        if !(x[i].is_finite() && y[i].is_finite() && w.is_finite() && w > 0.0) {
            continue;
        }
        let r = y[i] - (intercept + slope * x[i]);
        ss_res += w * r * r;
        ss_tot += w * (y[i] - ybar).powi(2);
    }
    let rsq = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { f64::NAN };

    let (slope_se, intercept_se) = if n > 2 {
        let sigma2 = ss_res / (n - 2) as f64;
        ((sigma2 * inv[(1, 1)]).sqrt(), (sigma2 * inv[(0, 0)]).sqrt())
    } else {
        (f64::NAN, f64::NAN)
    };

    Ok(LineFit { slope, intercept, rsq, slope_se, intercept_se, n })
}
