//! Bootstrap percentile intervals.
//!
//! Replicate estimates are reduced by sorting, so the interval does not
//! depend on the order in which parallel replicates finish.

use bf_core::{Error, Result};
use bf_prob::math::quantile_linear_sorted;

/// Percentile interval of the finite entries of `samples` at `conf_level`.
pub fn percentile_interval(samples: &[f64], conf_level: f64) -> Result<(f64, f64)> {
    if !(conf_level.is_finite() && conf_level > 0.0 && conf_level < 1.0) {
        return Err(Error::InvalidInput(format!("conf_level must be in (0,1), got {conf_level}")));
    }
    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "percentile interval requires at least 2 finite samples, got {}",
            sorted.len()
        )));
    }
    sorted.sort_by(f64::total_cmp);

    let alpha = (1.0 - conf_level) / 2.0;
    let lo = quantile_linear_sorted(&sorted, alpha);
    let hi = quantile_linear_sorted(&sorted, 1.0 - alpha);
    Ok((lo.min(hi), lo.max(hi)))
}

/// Stretch `(lo, hi)` so it contains `estimate`.
#[inline]
pub fn widen_to_contain((lo, hi): (f64, f64), estimate: f64) -> (f64, f64) {
    (lo.min(estimate), hi.max(estimate))
}
