//! Drainable-porosity strategies.
//!
//! Each [`PhiMethod`] turns the recession data into a sample of
//! [`phi_combo`] values; without an aquifer depth the samples are the
//! depth-normalized strength `φ·D^(2/3)`.

use bf_core::{Error, Result};
use bf_prob::{lognormal, math};
use serde::Serialize;

use crate::aquifer::{phi_combo, to_volumetric};
use crate::config::PhiMethod;
use crate::event_fit::EventFit;
use crate::pointcloud::{PointCloud, intercept, reference_point};

/// Porosity distribution summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhiEstimate {
    /// Strategy that produced the samples.
    pub method: PhiMethod,
    /// Positive finite samples, sorted.
    pub samples: Vec<f64>,
    /// Centre: sample mean, or the fitted log-normal mean for `DistFit`.
    pub mean: f64,
    /// Sample median, or the fitted log-normal median for `DistFit`.
    pub median: f64,
    /// `(sample, CDF)` pairs: empirical, or the fitted CDF for `DistFit`.
    pub cdf: Vec<(f64, f64)>,
    /// Log-normal `(mu, sigma)` for `DistFit`.
    pub lognormal: Option<(f64, f64)>,
    /// True when no aquifer depth was available.
    pub depth_normalized: bool,
}

/// Data shared by all strategies.
#[derive(Debug, Clone, Copy)]
pub struct PhiInputs<'a> {
    /// τ-masked point cloud.
    pub cloud: &'a PointCloud,
    /// Fits of the events inside the τ-mask.
    pub fits: &'a [&'a EventFit],
    /// Population early-time (b = 3) intercept, volumetric.
    pub a_early: f64,
    /// Early reference quantiles.
    pub early_quantiles: [f64; 2],
    /// Late reference quantiles.
    pub late_quantiles: [f64; 2],
    /// Basin area [m²].
    pub area: f64,
    /// Aquifer depth [m].
    pub depth: Option<f64>,
    /// Whether discharge is in mm/day (intercepts need conversion).
    pub per_area: bool,
}

impl PhiInputs<'_> {
    fn volumetric(&self, a: f64, b: f64) -> f64 {
        if self.per_area { to_volumetric(a, b, self.area) } else { a }
    }
}

fn point_cloud_samples(inputs: &PhiInputs<'_>) -> Vec<f64> {
    let cloud = inputs.cloud;
    (0..cloud.len())
        .filter(|&i| cloud.mask[i])
        .map(|i| {
            let a2 = inputs.volumetric(-cloud.dqdt[i] / cloud.q[i], 1.0);
            phi_combo(inputs.a_early, a2, inputs.area, inputs.depth)
        })
        .collect()
}

fn phi_combo_samples(inputs: &PhiInputs<'_>) -> Vec<f64> {
    inputs
        .fits
        .iter()
        .filter_map(|fit| {
            let (q, dqdt) = (fit.window_q(), fit.window_dqdt());
            let a1 = intercept(&[reference_point(&q, &dqdt, inputs.early_quantiles)?], 3.0)?;
            let a2 = intercept(&[reference_point(&q, &dqdt, inputs.late_quantiles)?], 1.0)?;
            Some(phi_combo(inputs.volumetric(a1, 3.0), inputs.volumetric(a2, 1.0), inputs.area, inputs.depth))
        })
        .collect()
}

fn empirical_cdf(sorted: &[f64]) -> Vec<(f64, f64)> {
    let n = sorted.len() as f64;
    sorted.iter().enumerate().map(|(i, &x)| (x, (i + 1) as f64 / n)).collect()
}

/// Run one porosity strategy.
pub fn estimate_phi(method: PhiMethod, inputs: &PhiInputs<'_>) -> Result<PhiEstimate> {
    let raw = match method {
        PhiMethod::PointCloud => point_cloud_samples(inputs),
        PhiMethod::PhiCombo | PhiMethod::DistFit => phi_combo_samples(inputs),
    };
    let mut samples: Vec<f64> = raw.into_iter().filter(|v| v.is_finite() && *v > 0.0).collect();
    if samples.is_empty() {
        return Err(Error::InsufficientData(format!("{method:?}: no valid porosity samples")));
    }
    samples.sort_by(f64::total_cmp);
    let depth_normalized = inputs.depth.is_none();

    if method == PhiMethod::DistFit {
        let (mu, sigma) = lognormal::fit_mle(&samples)?;
        let cdf = samples
            .iter()
            .map(|&x| lognormal::cdf(x, mu, sigma).map(|p| (x, p)))
            .collect::<Result<Vec<_>>>()?;
        return Ok(PhiEstimate {
            method,
            mean: lognormal::mean(mu, sigma),
            median: lognormal::median(mu),
            cdf,
            lognormal: Some((mu, sigma)),
            samples,
            depth_normalized,
        });
    }

    Ok(PhiEstimate {
        method,
        mean: math::nanmean(&samples),
        median: math::quantile_linear_sorted(&samples, 0.5),
        cdf: empirical_cdf(&samples),
        lognormal: None,
        samples,
        depth_normalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_fit::{EtsWindow, EventFitStatus};
    use approx::assert_relative_eq;

    fn fit_with_windows(index: usize, points: &[(f64, f64)]) -> EventFit {
        let windows = points
            .iter()
            .enumerate()
            .map(|(i, &(q, dqdt))| EtsWindow {
                start: i,
                end: i + 1,
                tq: i as f64 + 0.5,
                dt: 1.0,
                q,
                dqdt,
                rq: f64::NAN,
                rsq: 1.0,
            })
            .collect();
        EventFit {
            event_index: index,
            t: Vec::new(),
            q: Vec::new(),
            dqdt: Vec::new(),
            dt: Vec::new(),
            tq: Vec::new(),
            rq: Vec::new(),
            rsq: Vec::new(),
            windows,
            gamma: 0.1,
            exp_fit: None,
            power_law: None,
            tau: 10.0,
            status: EventFitStatus::NoPowerLaw,
        }
    }

    #[test]
    fn point_cloud_linear_points_give_constant_phi() {
        // Every point on -dQ/dt = 0.1 Q: a2_i is constant.
        let fit = fit_with_windows(0, &[(10.0, -1.0), (5.0, -0.5), (2.0, -0.2)]);
        let cloud = PointCloud::from_fits([&fit]);
        let fits = [&fit];
        let inputs = PhiInputs {
            cloud: &cloud,
            fits: &fits,
            a_early: 1e-12,
            early_quantiles: [0.9, 0.9],
            late_quantiles: [0.5, 0.5],
            area: 1.0e6,
            depth: Some(2.0),
            per_area: false,
        };
        let est = estimate_phi(PhiMethod::PointCloud, &inputs).unwrap();
        let expected = phi_combo(1e-12, 0.1, 1.0e6, Some(2.0));
        assert_eq!(est.samples.len(), 3);
        assert_relative_eq!(est.median, expected, max_relative = 1e-9);
        assert_relative_eq!(est.mean, expected, max_relative = 1e-9);
        assert_eq!(est.cdf.last().unwrap().1, 1.0);
        assert!(!est.depth_normalized);
    }

    #[test]
    fn phi_combo_and_distfit_use_event_intercepts() {
        let fits: Vec<EventFit> = (0..6)
            .map(|e| {
                let a = 0.05 * (1.0 + 0.1 * e as f64);
                fit_with_windows(e, &[(8.0, -8.0 * a), (4.0, -4.0 * a), (2.0, -2.0 * a), (1.0, -a)])
            })
            .collect();
        let refs: Vec<&EventFit> = fits.iter().collect();
        let cloud = PointCloud::from_fits(refs.iter().copied());
        let inputs = PhiInputs {
            cloud: &cloud,
            fits: &refs,
            a_early: f64::NAN,
            early_quantiles: [0.9, 0.9],
            late_quantiles: [0.5, 0.5],
            area: 1.0e6,
            depth: None,
            per_area: false,
        };
        let combo = estimate_phi(PhiMethod::PhiCombo, &inputs).unwrap();
        assert_eq!(combo.samples.len(), 6);
        assert!(combo.depth_normalized);
        assert!(combo.lognormal.is_none());

        let dist = estimate_phi(PhiMethod::DistFit, &inputs).unwrap();
        assert_eq!(dist.samples, combo.samples);
        let (mu, _) = dist.lognormal.unwrap();
        assert_relative_eq!(dist.median, mu.exp());
        assert!(dist.cdf.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(dist.cdf.iter().all(|&(_, p)| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn no_samples_is_insufficient() {
        let cloud = PointCloud::default();
        let inputs = PhiInputs {
            cloud: &cloud,
            fits: &[],
            a_early: 1.0,
            early_quantiles: [0.9, 0.9],
            late_quantiles: [0.5, 0.5],
            area: 1.0e6,
            depth: None,
            per_area: false,
        };
        let err = estimate_phi(PhiMethod::PointCloud, &inputs).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }
}
