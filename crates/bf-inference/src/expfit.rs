//! Whole-event exponential fit `Q(t) ≈ A·exp(-γt) + C`.
//!
//! The decay rate γ sizes the sliding windows of the exponential time-step
//! method. Strategies are tried in a fixed order and the first one that
//! returns a physical γ wins.

use bf_core::{Error, Result};
use serde::Serialize;

use crate::linfit::ols;
use crate::optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizerConfig};

/// One way of obtaining the decay rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpFitStrategy {
    /// L-BFGS on `[ln A, ln γ, C]` minimising the squared residuals.
    NonlinearLeastSquares,
    /// OLS of `ln(Q - C)` on `t`, first with `C = 0`, then with `C` just
    /// below the event minimum.
    LogLinear,
}

/// Fallback order used by [`fit_exponential`].
pub const DEFAULT_STRATEGIES: [ExpFitStrategy; 2] =
    [ExpFitStrategy::NonlinearLeastSquares, ExpFitStrategy::LogLinear];

/// Fitted exponential decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpFit {
    /// Amplitude `A`.
    pub amplitude: f64,
    /// Decay rate `γ` (> 0).
    pub gamma: f64,
    /// Baseline `C`.
    pub offset: f64,
    /// Sum of squared residuals.
    pub sse: f64,
    /// Strategy that produced the fit.
    pub strategy: ExpFitStrategy,
}

impl ExpFit {
    /// Model value at `t`.
    pub fn predict(&self, t: f64) -> f64 {
        self.amplitude * (-self.gamma * t).exp() + self.offset
    }
}

struct Samples {
    t: Vec<f64>,
    q: Vec<f64>,
}

impl Samples {
    fn finite(t: &[f64], q: &[f64]) -> Result<Self> {
        if t.len() != q.len() {
            return Err(Error::InvalidInput(format!(
                "exponential fit: t and q differ in length ({} != {})",
                t.len(),
                q.len()
            )));
        }
        let (t, q): (Vec<f64>, Vec<f64>) = t
            .iter()
            .zip(q)
            .filter(|(t, q)| t.is_finite() && q.is_finite())
            .map(|(&t, &q)| (t, q))
            .unzip();
        if t.len() < 3 {
            return Err(Error::InsufficientData(format!(
                "exponential fit needs >= 3 finite samples, got {}",
                t.len()
            )));
        }
        Ok(Self { t, q })
    }

    fn bounds(&self) -> (f64, f64) {
        self.q.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    fn sse(&self, amplitude: f64, gamma: f64, offset: f64) -> f64 {
        self.t
            .iter()
            .zip(&self.q)
            .map(|(&t, &q)| (amplitude * (-gamma * t).exp() + offset - q).powi(2))
            .sum()
    }
}

fn accept(fit: ExpFit) -> Result<ExpFit> {
    if fit.gamma.is_finite() && fit.gamma > 0.0 && fit.amplitude.is_finite() && fit.sse.is_finite() {
        Ok(fit)
    } else {
        Err(Error::DegenerateFit(format!(
            "{:?}: non-physical decay rate γ={}",
            fit.strategy, fit.gamma
        )))
    }
}

// Scaled squared residuals; parameters are [ln A, ln γ, C].
struct ExpResiduals<'a> {
    samples: &'a Samples,
    scale: f64,
}

impl ObjectiveFunction for ExpResiduals<'_> {
    fn eval(&self, p: &[f64]) -> Result<f64> {
        Ok(self.samples.sse(p[0].exp(), p[1].exp(), p[2]) / self.scale)
    }

    fn gradient(&self, p: &[f64]) -> Result<Vec<f64>> {
        let (amp, gamma, c) = (p[0].exp(), p[1].exp(), p[2]);
        let mut g = vec![0.0; 3];
        for (&t, &q) in self.samples.t.iter().zip(&self.samples.q) {
            let e = amp * (-gamma * t).exp();
            let r2 = 2.0 * (e + c - q) / self.scale;
            g[0] += r2 * e;
            g[1] -= r2 * e * gamma * t;
            g[2] += r2;
        }
        Ok(g)
    }
}

fn log_linear_with_offset(samples: &Samples, offset: f64) -> Result<ExpFit> {
    let y: Vec<f64> = samples.q.iter().map(|&q| if q > offset { (q - offset).ln() } else { f64::NAN }).collect();
    let line = ols(&samples.t, &y)?;
    accept(ExpFit {
        amplitude: line.intercept.exp(),
        gamma: -line.slope,
        offset,
        sse: samples.sse(line.intercept.exp(), -line.slope, offset),
        strategy: ExpFitStrategy::LogLinear,
    })
}

fn log_linear(samples: &Samples) -> Result<ExpFit> {
    let (lo, hi) = samples.bounds();
    match log_linear_with_offset(samples, 0.0) {
        Ok(fit) => Ok(fit),
        Err(first) => {
            let offset = lo - 0.01 * (hi - lo).max(f64::MIN_POSITIVE);
            log_linear_with_offset(samples, offset).map_err(|_| first)
        }
    }
}

fn nonlinear_least_squares(samples: &Samples, config: &OptimizerConfig) -> Result<ExpFit> {
    let (lo, hi) = samples.bounds();
    let duration = samples.t[samples.t.len() - 1] - samples.t[0];
    let init = match log_linear(samples) {
        Ok(fit) => vec![fit.amplitude.ln(), fit.gamma.ln(), fit.offset],
        Err(_) => vec![(hi - lo).ln(), (1.0 / duration.max(f64::MIN_POSITIVE)).ln(), lo],
    };
    let span = hi.abs().max(1.0);
    let bounds = [(-50.0, 50.0), (-30.0, 10.0), (-span, lo)];
    let objective = ExpResiduals { samples, scale: samples.q.len() as f64 * span * span };

    let res = LbfgsbOptimizer::new(*config).minimize(&objective, &init, &bounds)?;
    if !res.converged {
        return Err(Error::DegenerateFit(format!("exponential fit did not converge: {res}")));
    }
    let (amplitude, gamma, offset) = (res.parameters[0].exp(), res.parameters[1].exp(), res.parameters[2]);
    accept(ExpFit {
        amplitude,
        gamma,
        offset,
        sse: samples.sse(amplitude, gamma, offset),
        strategy: ExpFitStrategy::NonlinearLeastSquares,
    })
}

/// Fit with one explicit strategy.
pub fn fit_with_strategy(
    strategy: ExpFitStrategy,
    t: &[f64],
    q: &[f64],
    config: &OptimizerConfig,
) -> Result<ExpFit> {
    let samples = Samples::finite(t, q)?;
    if !(samples.q[0] > samples.q[samples.q.len() - 1]) {
        return Err(Error::DegenerateFit("exponential fit: discharge is not receding".to_string()));
    }
    match strategy {
        ExpFitStrategy::NonlinearLeastSquares => nonlinear_least_squares(&samples, config),
        ExpFitStrategy::LogLinear => log_linear(&samples),
    }
}

/// Try [`DEFAULT_STRATEGIES`] in order; the last failure is returned when
/// none succeeds.
pub fn fit_exponential(t: &[f64], q: &[f64], config: &OptimizerConfig) -> Result<ExpFit> {
    let mut last = Error::DegenerateFit("no exponential fit strategy configured".to_string());
    for strategy in DEFAULT_STRATEGIES {
        match fit_with_strategy(strategy, t, q, config) {
            Ok(fit) => return Ok(fit),
            Err(e @ Error::InvalidInput(_)) => return Err(e),
            Err(e) => {
                log::debug!("exponential fit strategy {strategy:?} failed: {e}");
                last = e;
            }
        }
    }
    Err(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn cfg() -> OptimizerConfig {
        OptimizerConfig { max_iter: 500, tol: 1e-10, m: 7 }
    }

    #[test]
    fn recovers_pure_decay() {
        let t: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let q: Vec<f64> = t.iter().map(|t| 100.0 * (-0.05 * t).exp()).collect();
        let fit = fit_exponential(&t, &q, &cfg()).unwrap();
        assert_relative_eq!(fit.gamma, 0.05, max_relative = 1e-3);
        assert_relative_eq!(fit.predict(10.0), q[10], max_relative = 1e-3);
    }

    #[test]
    fn nonlinear_fit_finds_offset() {
        let t: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let q: Vec<f64> = t.iter().map(|t| 40.0 * (-0.1 * t).exp() + 5.0).collect();
        let fit = fit_with_strategy(ExpFitStrategy::NonlinearLeastSquares, &t, &q, &cfg()).unwrap();
        assert_relative_eq!(fit.gamma, 0.1, max_relative = 1e-2);
        assert_relative_eq!(fit.offset, 5.0, epsilon = 0.1);
    }

    #[test]
    fn noisy_decay_is_close() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.2).unwrap();
        let t: Vec<f64> = (0..80).map(|i| i as f64).collect();
        let q: Vec<f64> =
            t.iter().map(|t| 50.0 * (-0.04 * t).exp() + noise.sample(&mut rng)).collect();
        let fit = fit_exponential(&t, &q, &cfg()).unwrap();
        assert!((fit.gamma - 0.04).abs() < 0.005, "gamma = {}", fit.gamma);
    }

    #[test]
    fn log_linear_fallback_alone() {
        let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let q: Vec<f64> = t.iter().map(|t| 3.0 * (-0.3 * t).exp()).collect();
        let fit = fit_with_strategy(ExpFitStrategy::LogLinear, &t, &q, &cfg()).unwrap();
        assert_eq!(fit.strategy, ExpFitStrategy::LogLinear);
        assert_relative_eq!(fit.gamma, 0.3, max_relative = 1e-9);
        assert_eq!(fit.offset, 0.0);
    }

    #[test]
    fn rising_or_flat_series_fail() {
        let t = [0.0, 1.0, 2.0, 3.0, 4.0];
        let flat = [2.0; 5];
        assert!(fit_exponential(&t, &flat, &cfg()).is_err());
        let rising = [1.0, 2.0, 4.0, 8.0, 16.0];
        assert!(fit_exponential(&t, &rising, &cfg()).is_err());
    }

    #[test]
    fn residual_gradient_matches_central_differences() {
        let t: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let q: Vec<f64> = t.iter().map(|t| 20.0 * (-0.08 * t).exp() + 1.0).collect();
        let samples = Samples::finite(&t, &q).unwrap();
        let objective = ExpResiduals { samples: &samples, scale: 30.0 * 400.0 };
        let p = [2.5, -2.3, 0.7];
        let g = objective.gradient(&p).unwrap();
        let h = 1e-6;
        for i in 0..3 {
            let (mut hi, mut lo) = (p, p);
            hi[i] += h;
            lo[i] -= h;
            let fd = (objective.eval(&hi).unwrap() - objective.eval(&lo).unwrap()) / (2.0 * h);
            assert_relative_eq!(g[i], fd, max_relative = 1e-5, epsilon = 1e-9);
        }
    }

    #[test]
    fn too_few_samples() {
        let err = fit_exponential(&[0.0, 1.0], &[2.0, 1.0], &cfg()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }
}
