//! Standard normal quantiles for confidence intervals.

use bf_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile of the standard normal at probability `p` in `(0, 1)`.
pub fn quantile(p: f64) -> Result<f64> {
    if !(p.is_finite() && p > 0.0 && p < 1.0) {
        return Err(Error::InvalidInput(format!("probability must be in (0, 1), got {p}")));
    }
    let std = Normal::new(0.0, 1.0)
        .map_err(|e| Error::InvalidInput(format!("standard normal: {e}")))?;
    Ok(std.inverse_cdf(p))
}

/// Half-width multiplier `z` of a two-sided interval at `conf_level`.
pub fn two_sided_z(conf_level: f64) -> Result<f64> {
    quantile(0.5 + 0.5 * conf_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ninety_five_percent_is_1_96() {
        assert_relative_eq!(two_sided_z(0.95).unwrap(), 1.959_963_984_540_054, epsilon = 1e-8);
        assert_relative_eq!(quantile(0.5).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn quantile_is_antisymmetric() {
        assert_relative_eq!(quantile(0.1).unwrap(), -quantile(0.9).unwrap(), epsilon = 1e-10);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(quantile(0.0).is_err());
        assert!(quantile(1.0).is_err());
        assert!(two_sided_z(f64::NAN).is_err());
    }
}
