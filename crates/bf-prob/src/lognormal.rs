//! Log-normal distribution utilities.

use bf_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, LogNormal};

/// CDF of `LogNormal(mu, sigma)` at `x`.
pub fn cdf(x: f64, mu: f64, sigma: f64) -> Result<f64> {
    let dist = LogNormal::new(mu, sigma)
        .map_err(|e| Error::InvalidInput(format!("invalid log-normal parameters: {e}")))?;
    Ok(dist.cdf(x))
}

/// Maximum-likelihood `(mu, sigma)` for positive samples.
///
/// Non-finite and non-positive samples are ignored.
pub fn fit_mle(samples: &[f64]) -> Result<(f64, f64)> {
    let logs: Vec<f64> =
        samples.iter().filter(|x| x.is_finite() && **x > 0.0).map(|x| x.ln()).collect();
    if logs.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "log-normal fit needs at least 2 positive samples, got {}",
            logs.len()
        )));
    }
    let n = logs.len() as f64;
    let mu = logs.iter().sum::<f64>() / n;
    let var = logs.iter().map(|l| (l - mu).powi(2)).sum::<f64>() / n;
    if !(var.is_finite() && var > 0.0) {
        return Err(Error::DegenerateFit("log-normal fit: samples have zero spread".to_string()));
    }
    Ok((mu, var.sqrt()))
}

/// Mean of `LogNormal(mu, sigma)`: `exp(mu + sigma²/2)`.
#[inline]
pub fn mean(mu: f64, sigma: f64) -> f64 {
    (mu + 0.5 * sigma * sigma).exp()
}

/// Median of `LogNormal(mu, sigma)`: `exp(mu)`.
#[inline]
pub fn median(mu: f64) -> f64 {
    mu.exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_distr::{Distribution, LogNormal as RandLogNormal};

    #[test]
    fn cdf_at_median_is_half() {
        let p = cdf(median(0.7), 0.7, 0.4).unwrap();
        assert_relative_eq!(p, 0.5, epsilon = 1e-9);
        assert!(cdf(1.0, 0.0, -1.0).is_err());
    }

    #[test]
    fn fit_mle_recovers_parameters() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let dist = RandLogNormal::new(-1.2, 0.3).unwrap();
        let xs: Vec<f64> = (0..5000).map(|_| dist.sample(&mut rng)).collect();
        let (mu, sigma) = fit_mle(&xs).unwrap();
        assert!((mu + 1.2).abs() < 0.02, "mu={mu}");
        assert!((sigma - 0.3).abs() < 0.02, "sigma={sigma}");
        assert!(mean(mu, sigma) > median(mu));
    }

    #[test]
    fn fit_mle_degenerate_inputs() {
        assert!(matches!(fit_mle(&[1.0]), Err(Error::InsufficientData(_))));
        assert!(matches!(fit_mle(&[2.0, 2.0, 2.0]), Err(Error::DegenerateFit(_))));
    }
}
