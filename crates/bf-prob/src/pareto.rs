//! Continuous Pareto (power-law tail) distribution.
//!
//! Density above a lower cutoff `xmin`:
//! `p(x) = (α - 1)/xmin · (x/xmin)^(-α)` for `x >= xmin`, `α > 1`.
//!
//! [`fit_tail`] implements the Clauset–Shalizi–Newman procedure: for every
//! candidate cutoff the exponent has the closed-form MLE
//! `α̂ = 1 + n / Σ ln(x_i / xmin)`, and the cutoff minimising the
//! Kolmogorov–Smirnov distance between the empirical and fitted tail wins.

use bf_core::{Error, Result};

/// Result of a power-law tail fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParetoFit {
    /// Tail exponent α.
    pub alpha: f64,
    /// Standard error of α, `(α - 1)/sqrt(n)`.
    pub alpha_se: f64,
    /// Lower cutoff of the power-law regime.
    pub xmin: f64,
    /// Number of samples at or above `xmin`.
    pub n_tail: usize,
    /// KS distance of the fitted tail.
    pub ks: f64,
}

/// CDF of the Pareto distribution: `1 - (x/xmin)^(1-α)`.
pub fn cdf(x: f64, alpha: f64, xmin: f64) -> Result<f64> {
    validate_params(alpha, xmin)?;
    if x <= xmin {
        return Ok(0.0);
    }
    Ok(1.0 - (x / xmin).powf(1.0 - alpha))
}

fn validate_params(alpha: f64, xmin: f64) -> Result<()> {
    if !(alpha.is_finite() && alpha > 1.0) {
        return Err(Error::InvalidInput(format!("alpha must be finite and > 1, got {alpha}")));
    }
    if !(xmin.is_finite() && xmin > 0.0) {
        return Err(Error::InvalidInput(format!("xmin must be finite and > 0, got {xmin}")));
    }
    Ok(())
}

/// Closed-form MLE of α for samples already restricted to `x >= xmin`.
pub fn mle_alpha(tail: &[f64], xmin: f64) -> Result<f64> {
    if tail.is_empty() {
        return Err(Error::InsufficientData("empty tail".to_string()));
    }
    let s: f64 = tail.iter().map(|&x| (x / xmin).ln()).sum();
    if !(s.is_finite() && s > 0.0) {
        return Err(Error::DegenerateFit(format!(
            "tail has no spread above xmin={xmin} (sum of log ratios = {s})"
        )));
    }
    Ok(1.0 + tail.len() as f64 / s)
}

/// KS distance between the empirical CDF of `sorted_tail` and the fitted Pareto CDF.
fn ks_distance(sorted_tail: &[f64], alpha: f64, xmin: f64) -> Result<f64> {
    let n = sorted_tail.len() as f64;
    let mut d: f64 = 0.0;
    for (i, &x) in sorted_tail.iter().enumerate() {
        let model = cdf(x, alpha, xmin)?;
        let lo = i as f64 / n;
        let hi = (i + 1) as f64 / n;
        d = d.max((model - lo).abs()).max((hi - model).abs());
    }
    Ok(d)
}

/// Fit a power-law tail to `samples` with KS-optimal `xmin`.
///
/// Non-finite and non-positive samples are ignored. Candidate cutoffs are the
/// distinct sample values that leave at least `min_tail` samples in the tail.
pub fn fit_tail(samples: &[f64], min_tail: usize) -> Result<ParetoFit> {
    let min_tail = min_tail.max(2);
    let mut x: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite() && *v > 0.0).collect();
    if x.len() < min_tail {
        return Err(Error::InsufficientData(format!(
            "power-law tail fit needs at least {min_tail} positive samples, got {}",
            x.len()
        )));
    }
    x.sort_by(f64::total_cmp);

    let mut best: Option<ParetoFit> = None;
    let mut i = 0;
    while i + min_tail <= x.len() {
        let xmin = x[i];
        let tail = &x[i..];
        if let Ok(alpha) = mle_alpha(tail, xmin) {
            let ks = ks_distance(tail, alpha, xmin)?;
            if best.is_none_or(|b| ks < b.ks) {
                let n_tail = tail.len();
                best = Some(ParetoFit {
                    alpha,
                    alpha_se: (alpha - 1.0) / (n_tail as f64).sqrt(),
                    xmin,
                    n_tail,
                    ks,
                });
            }
        }
        // Skip ties: the next candidate is the next distinct value.
        let mut j = i + 1;
        while j < x.len() && x[j] == xmin {
            j += 1;
        }
        i = j;
    }

    best.ok_or_else(|| {
        Error::DegenerateFit("no candidate xmin produced a finite tail exponent".to_string())
    })
}
