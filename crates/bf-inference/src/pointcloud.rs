//! Pooled `(q, dQ/dt)` point cloud and fixed-slope intercepts.
//!
//! Every surviving ETS window of every usable event contributes one point.
//! Reference points are quantile pairs of the cloud; an intercept line of
//! fixed slope `s` through them in log-log space gives
//! `ln a = mean(ln(-dQ/dt_ref) - s·ln q_ref)`.

use bf_prob::math::nanquantile;
use serde::Serialize;

use crate::event_fit::EventFit;

/// Pooled points with their event of origin and the τ-mask.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointCloud {
    /// Discharge.
    pub q: Vec<f64>,
    /// Derivative (< 0).
    pub dqdt: Vec<f64>,
    /// Window r², used as regression weight.
    pub rsq: Vec<f64>,
    /// `event_index` of the point's event.
    pub event: Vec<usize>,
    /// τ of the point's event.
    pub tau: Vec<f64>,
    /// τ-mask: true for points whose event τ is at or above `tau0`.
    pub mask: Vec<bool>,
}

impl PointCloud {
    /// Pool the windows of the usable fits, every point inside the τ-mask.
    pub fn from_fits<'a>(fits: impl IntoIterator<Item = &'a EventFit>) -> Self {
        let mut cloud = Self::default();
        for fit in fits.into_iter().filter(|f| f.is_usable()) {
            for w in &fit.windows {
                if !(w.q.is_finite() && w.q > 0.0 && w.dqdt.is_finite() && w.dqdt < 0.0) {
                    continue;
                }
                cloud.q.push(w.q);
                cloud.dqdt.push(w.dqdt);
                cloud.rsq.push(w.rsq);
                cloud.event.push(fit.event_index);
                cloud.tau.push(fit.tau);
                cloud.mask.push(true);
            }
        }
        cloud
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// True without points.
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Recompute the τ-mask for threshold `tau0`.
    pub fn with_tau_threshold(mut self, tau0: f64) -> Self {
        self.mask = self.tau.iter().map(|&t| t.is_finite() && t >= tau0).collect();
        self
    }

    /// Points inside the τ-mask.
    pub fn n_masked(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// `(q, dqdt, rsq)` of the points inside the τ-mask.
    pub fn masked(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut q = Vec::with_capacity(self.len());
        let mut dqdt = Vec::with_capacity(self.len());
        let mut rsq = Vec::with_capacity(self.len());
        for i in (0..self.len()).filter(|&i| self.mask[i]) {
            q.push(self.q[i]);
            dqdt.push(self.dqdt[i]);
            rsq.push(self.rsq[i]);
        }
        (q, dqdt, rsq)
    }
}

/// Reference point `(Quantile_p0(q), Quantile_p1(-dQ/dt))`.
///
/// `None` when either quantile is missing or non-positive.
pub fn reference_point(q: &[f64], dqdt: &[f64], quantiles: [f64; 2]) -> Option<(f64, f64)> {
    let rate: Vec<f64> = dqdt.iter().map(|d| -d).collect();
    let q_ref = nanquantile(q, quantiles[0]);
    let r_ref = nanquantile(&rate, quantiles[1]);
    (q_ref.is_finite() && q_ref > 0.0 && r_ref.is_finite() && r_ref > 0.0).then_some((q_ref, r_ref))
}

/// Intercept `a` of the line with slope `slope` through the reference
/// points `(q_ref, -dQ/dt_ref)` in log-log space.
pub fn intercept(points: &[(f64, f64)], slope: f64) -> Option<f64> {
    if points.is_empty() || !slope.is_finite() {
        return None;
    }
    let ln_a = points.iter().map(|(q, r)| r.ln() - slope * q.ln()).sum::<f64>() / points.len() as f64;
    let a = ln_a.exp();
    (a.is_finite() && a > 0.0).then_some(a)
}
