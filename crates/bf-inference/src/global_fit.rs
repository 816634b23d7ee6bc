//! Population (global) recession fit.
//!
//! Pools the per-event windows into a point cloud, cuts it with a τ
//! threshold from a power-law tail fit and takes the exponent `b` from the
//! tail exponent (`b = α/(α-1)`). Populations too small for a tail fit fall
//! back to weighted log-log regression over the cloud. The scale `a` comes
//! from fixed-slope intercepts through quantile reference points. Porosity and aquifer properties follow from the
//! early (b = 3) and late (b = 1) intercepts.

use bf_core::{BasinGeometry, Error, Result};
use bf_prob::math::nanmedian;
use bf_prob::{normal, pareto};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use crate::aquifer::{AquiferProperties, invert, reconcile_geometry, to_volumetric};
use crate::bootstrap_ci::{percentile_interval, widen_to_contain};
use crate::config::{DischargeUnits, GlobalFitConfig};
use crate::event_fit::EventFit;
use crate::linfit::wls;
use crate::notice::Notice;
use crate::phi::{PhiEstimate, PhiInputs, estimate_phi};
use crate::pointcloud::{PointCloud, intercept, reference_point};
use crate::recession::{LINEAR_B_TOL, b_from_tail, q_from_tau, q_nonlin};

/// Where the population exponent `b` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExponentSource {
    /// Pareto tail of the event timescales, `b = α/(α-1)`.
    TauTail,
    /// Weighted regression of `ln(-dQ/dt)` on `ln Q` over the masked cloud.
    PointCloud,
}

/// Population-level recession parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalFit {
    /// Exponent `b`.
    pub b: f64,
    /// Lower bound of `b`.
    pub b_l: f64,
    /// Upper bound of `b`.
    pub b_h: f64,
    /// Estimator that produced `b`.
    pub b_source: ExponentSource,
    /// Regression slope of the masked cloud, reported even when `b` comes from the tail.
    pub b_cloud: f64,
    /// Scale `a` (discharge units of the input).
    pub a: f64,
    /// Lower bound of `a`.
    pub a_l: f64,
    /// Upper bound of `a`.
    pub a_h: f64,
    /// τ threshold of the τ-mask.
    pub tau0: f64,
    /// Median τ of the events inside the τ-mask.
    pub tau: f64,
    /// Pareto tail exponent of the event τ values.
    pub alpha: Option<f64>,
    /// Discharge whose timescale is `tau0`.
    pub q0: f64,
    /// Discharge after `tau0` of recession from `q0`.
    pub qexp: f64,
    /// Early-time intercept at `b = 3`.
    pub a_early: Option<f64>,
    /// Late-time intercept at `b = 1`.
    pub a_late: Option<f64>,
    /// Events contributing to the point cloud.
    pub n_events: usize,
    /// Events inside the τ-mask.
    pub n_tail_events: usize,
    /// Porosity estimate.
    pub phi: Option<PhiEstimate>,
    /// Aquifer inversions.
    pub aquifer: Option<AquiferProperties>,
    /// Geometry after consistency corrections.
    pub geometry: BasinGeometry,
    /// Whether the bounds are bootstrap percentiles.
    pub bootstrap: bool,
    /// Successful bootstrap replicates.
    pub n_bootstrap: usize,
    /// Pooled points with the τ-mask.
    pub point_cloud: PointCloud,
    /// Non-fatal notifications.
    pub notices: Vec<Notice>,
}

// Steps re-run by every bootstrap replicate.
struct CoreFit {
    cloud: PointCloud,
    tau0: f64,
    tau: f64,
    tail: Option<pareto::ParetoFit>,
    tail_notice: Option<Notice>,
    n_events: usize,
    n_tail_events: usize,
    b: f64,
    b_bounds: (f64, f64),
    b_source: ExponentSource,
    b_cloud: f64,
    a: f64,
    a_bounds: (f64, f64),
    early: Option<(f64, f64)>,
    late: Option<(f64, f64)>,
}

// `forced` pins the exponent estimator so bootstrap replicates resample the
// same statistic as the point estimate.
fn fit_core(
    fits: &[&EventFit],
    config: &GlobalFitConfig,
    forced: Option<ExponentSource>,
) -> Result<CoreFit> {
    let usable: Vec<&EventFit> =
        fits.iter().copied().filter(|f| f.is_usable() && f.tau.is_finite() && f.tau > 0.0).collect();
    if usable.is_empty() {
        return Err(Error::InsufficientData("no usable event fits".to_string()));
    }
    let taus: Vec<f64> = usable.iter().map(|f| f.tau).collect();

    let (tau0, tail, tail_notice) = if taus.len() >= config.min_tail_events {
        match pareto::fit_tail(&taus, config.min_tail_events) {
            Ok(p) => (p.xmin, Some(p), None),
            Err(e) => {
                let notice = Notice::TailFitSkipped { n_events: taus.len(), reason: e.to_string() };
                (taus.iter().copied().fold(f64::INFINITY, f64::min), None, Some(notice))
            }
        }
    } else {
        let notice = Notice::TailFitSkipped {
            n_events: taus.len(),
            reason: format!("fewer than {} events", config.min_tail_events),
        };
        (taus.iter().copied().fold(f64::INFINITY, f64::min), None, Some(notice))
    };

    let cloud = PointCloud::from_fits(usable.iter().copied()).with_tau_threshold(tau0);
    let (q, dqdt, rsq) = cloud.masked();
    if q.len() < 3 {
        return Err(Error::InsufficientData(format!(
            "population fit needs >= 3 masked points, got {}",
            q.len()
        )));
    }
    let tail_taus: Vec<f64> = taus.iter().copied().filter(|&t| t >= tau0).collect();

    let x: Vec<f64> = q.iter().map(|v| v.ln()).collect();
    let y: Vec<f64> = dqdt.iter().map(|v| (-v).ln()).collect();
    let line = wls(&x, &y, Some(&rsq))?;

    let source = forced.unwrap_or(if tail.is_some() {
        ExponentSource::TauTail
    } else {
        ExponentSource::PointCloud
    });
    let (b, b_bounds) = match (source, &tail) {
        (ExponentSource::TauTail, Some(p)) => {
            let b = b_from_tail(p.alpha);
            // Delta method: db/dα = -1/(α-1)².
            let half = normal::two_sided_z(config.conf_level)? * p.alpha_se / (p.alpha - 1.0).powi(2);
            (b, (b - half, b + half))
        }
        (ExponentSource::TauTail, None) => {
            return Err(Error::DegenerateFit("τ tail fit unavailable for the exponent".to_string()));
        }
        (ExponentSource::PointCloud, _) => (line.slope, line.slope_interval(config.conf_level)),
    };

    let early = reference_point(&q, &dqdt, config.early_quantiles);
    let late = reference_point(&q, &dqdt, config.late_quantiles);
    let refs: Vec<(f64, f64)> = early.into_iter().chain(late).collect();
    let a = intercept(&refs, b)
        .ok_or_else(|| Error::DegenerateFit("no valid reference point for the intercept".to_string()))?;
    let a_bounds = match (intercept(&refs, b_bounds.1), intercept(&refs, b_bounds.0)) {
        (Some(x), Some(y)) => widen_to_contain((x.min(y), x.max(y)), a),
        _ => (a, a),
    };

    Ok(CoreFit {
        tau: nanmedian(&tail_taus),
        n_events: usable.len(),
        n_tail_events: tail_taus.len(),
        cloud,
        tau0,
        tail,
        tail_notice,
        b,
        b_bounds,
        b_source: source,
        b_cloud: line.slope,
        a,
        a_bounds,
        early,
        late,
    })
}

struct BootstrapBounds {
    b: (f64, f64),
    a: (f64, f64),
    n_ok: usize,
}

fn bootstrap_bounds(fits: &[&EventFit], config: &GlobalFitConfig, core: &CoreFit) -> Result<BootstrapBounds> {
    let n = fits.len();
    let replicates: Vec<Option<(f64, f64)>> = (0..config.n_reps)
        .into_par_iter()
        .map(|rep| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(rep as u64));
            let sample: Vec<&EventFit> = (0..n).map(|_| fits[rng.random_range(0..n)]).collect();
            fit_core(&sample, config, Some(core.b_source)).ok().map(|c| (c.b, c.a))
        })
        .collect();

    let (bs, as_): (Vec<f64>, Vec<f64>) = replicates.into_iter().flatten().unzip();
    let n_ok = bs.len();
    let b = widen_to_contain(percentile_interval(&bs, config.conf_level)?, core.b);
    let a = widen_to_contain(percentile_interval(&as_, config.conf_level)?, core.a);
    Ok(BootstrapBounds { b, a, n_ok })
}

/// Fit the population parameters from per-event fits.
///
/// Fails with [`Error::InsufficientData`] / [`Error::DegenerateFit`] when no
/// population exponent can be formed; every optional quantity that cannot be
/// derived is reported as missing with a [`Notice`].
pub fn fit_global(
    fits: &[EventFit],
    config: &GlobalFitConfig,
    geometry: &BasinGeometry,
) -> Result<GlobalFit> {
    config.validate()?;
    geometry.validate()?;
    let refs: Vec<&EventFit> = fits.iter().filter(|f| f.is_usable()).collect();
    let core = fit_core(&refs, config, None)?;
    let (geometry, mut notices) = reconcile_geometry(geometry, config.geometry_tolerance);
    if let Some(notice) = core.tail_notice.clone() {
        log::warn!("τ tail fit skipped: {notice:?}");
        notices.push(notice);
    }

    let b = core.b;
    log::debug!("population exponent b = {b:.4} from {:?} (cloud slope {:.4})", core.b_source, core.b_cloud);
    let (mut b_bounds, mut a_bounds, mut n_bootstrap) = (core.b_bounds, core.a_bounds, 0);
    let mut bootstrap = false;
    if config.bootstrap {
        match bootstrap_bounds(&refs, config, &core) {
            Ok(bb) => {
                b_bounds = bb.b;
                a_bounds = bb.a;
                n_bootstrap = bb.n_ok;
                bootstrap = true;
                log::debug!("bootstrap: {}/{} replicates succeeded", bb.n_ok, config.n_reps);
            }
            Err(e) => {
                log::warn!("bootstrap failed, keeping analytic bounds: {e}");
                notices.push(Notice::BootstrapFailed { reason: e.to_string() });
            }
        }
    }

    let a = core.a;
    let q0 = if (b - 1.0).abs() < LINEAR_B_TOL {
        core.early.map_or(f64::NAN, |(q, _)| q)
    } else {
        q_from_tau(core.tau0, a, b)
    };
    let qexp = q_nonlin(q0, a, b, core.tau0);
    let a_early = core.early.and_then(|p| intercept(&[p], 3.0));
    let a_late = core.late.and_then(|p| intercept(&[p], 1.0));

    let per_area = config.discharge_units == DischargeUnits::MillimetersPerDay;
    if per_area && geometry.area.is_none() {
        notices.push(Notice::UnitsNotConverted);
    }
    let volumetric = |a: f64, b: f64| match (per_area, geometry.area) {
        (true, Some(area)) => to_volumetric(a, b, area),
        _ => a,
    };

    let tail_fits: Vec<&EventFit> = refs.iter().copied().filter(|f| f.tau >= core.tau0).collect();
    let phi = match geometry.area {
        None => Err(Error::InsufficientData("basin area unknown".to_string())),
        Some(area) => {
            let inputs = PhiInputs {
                cloud: &core.cloud,
                fits: &tail_fits,
                a_early: a_early.map_or(f64::NAN, |a1| volumetric(a1, 3.0)),
                early_quantiles: config.early_quantiles,
                late_quantiles: config.late_quantiles,
                area,
                depth: geometry.aquifer_depth,
                per_area,
            };
            estimate_phi(config.phi_method, &inputs)
        }
    };
    let phi = match phi {
        Ok(est) => Some(est),
        Err(e) => {
            log::warn!("porosity estimate skipped: {e}");
            notices.push(Notice::PhiUnavailable { reason: e.to_string() });
            None
        }
    };

    let aquifer = match (a_early, a_late) {
        (Some(a1), Some(a2)) => {
            let phi_estimate = phi.as_ref().filter(|p| !p.depth_normalized).map(|p| p.median);
            let props = invert(
                volumetric(a1, 3.0),
                volumetric(a2, 1.0),
                phi_estimate,
                config.drainable_porosity,
                &geometry,
            );
            (props.k_early.is_some() || props.k_late.is_some() || props.thickness.is_some())
                .then_some(props)
        }
        _ => None,
    };
    if aquifer.is_none() {
        let reason = "conductivity needs porosity, depth, stream length and area".to_string();
        log::debug!("aquifer inversion skipped: {reason}");
        notices.push(Notice::AquiferUnavailable { reason });
    }

    Ok(GlobalFit {
        b,
        b_l: b_bounds.0,
        b_h: b_bounds.1,
        b_source: core.b_source,
        b_cloud: core.b_cloud,
        a,
        a_l: a_bounds.0,
        a_h: a_bounds.1,
        tau0: core.tau0,
        tau: core.tau,
        alpha: core.tail.map(|p| p.alpha),
        q0,
        qexp,
        a_early,
        a_late,
        n_events: core.n_events,
        n_tail_events: core.n_tail_events,
        phi,
        aquifer,
        geometry,
        bootstrap,
        n_bootstrap,
        point_cloud: core.cloud,
        notices,
    })
}
