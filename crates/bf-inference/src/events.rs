//! Recession event detection.
//!
//! A recession event is a run of consecutive decreasing steps of the
//! discharge series. Steps are classified from the first difference, filtered
//! for rain contamination and (optionally) convexity, and runs shorter than
//! the configured minimum are dropped with [`is_min_length`]. The kept runs
//! are trimmed to the local maximum that opens them and the local minimum that
//! closes them.

use bf_core::{Error, Result, TimeSeries};
use serde::Serialize;

use crate::config::{EventFinderConfig, ZeroDerivative};
use crate::runlength::is_min_length;

/// Index sets describing the events found in a series.
///
/// With no events every per-event field is empty; the record itself is
/// always returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventInfo {
    /// First sample of each kept event.
    pub istart: Vec<usize>,
    /// Last sample (inclusive) of each kept event.
    pub istop: Vec<usize>,
    /// Local maxima of the series.
    pub imax: Vec<usize>,
    /// Local minima of the series.
    pub imin: Vec<usize>,
    /// Samples with a non-negative second difference.
    pub iconvex: Vec<usize>,
    /// Per-sample mask, true inside kept events.
    pub keep: Vec<bool>,
    /// Candidate runs before start/end refinement.
    pub n_candidates: usize,
}

impl EventInfo {
    /// Number of kept events.
    pub fn n_events(&self) -> usize {
        self.istart.len()
    }

    /// True when no event was kept.
    pub fn is_empty(&self) -> bool {
        self.istart.is_empty()
    }

    /// `(istart, istop)` of every kept event.
    pub fn spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.istart.iter().copied().zip(self.istop.iter().copied())
    }
}

/// One recession event cut out of a [`TimeSeries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Position of the event in [`EventInfo`].
    pub index: usize,
    /// First sample in the parent series.
    pub istart: usize,
    /// Last sample (inclusive) in the parent series.
    pub istop: usize,
    /// Elapsed time since the event start.
    pub t: Vec<f64>,
    /// Discharge.
    pub q: Vec<f64>,
    /// Rainfall over the event, if the series has rainfall.
    pub r: Option<Vec<f64>>,
}

impl Event {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// True for an event without samples.
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// True when time, discharge and rainfall have the same length.
    pub fn lengths_match(&self) -> bool {
        self.t.len() == self.q.len() && self.r.as_ref().is_none_or(|r| r.len() == self.q.len())
    }

    /// Build an event directly from samples (used by tests and external loaders).
    ///
    /// Fails with [`Error::InvalidInput`] when `t` or `r` differ in length from `q`.
    pub fn from_samples(index: usize, t: Vec<f64>, q: Vec<f64>, r: Option<Vec<f64>>) -> Result<Self> {
        let t0 = t.first().copied().unwrap_or(0.0);
        let t: Vec<f64> = t.into_iter().map(|v| v - t0).collect();
        let istop = q.len().saturating_sub(1);
        let event = Self { index, istart: 0, istop, t, q, r };
        if !event.lengths_match() {
            return Err(Error::InvalidInput(format!(
                "event {index}: {} times, {} discharges, {:?} rainfall samples",
                event.t.len(),
                event.q.len(),
                event.r.as_ref().map(Vec::len)
            )));
        }
        Ok(event)
    }
}

/// Find recession events in a validated series.
pub fn find_events(series: &TimeSeries, config: &EventFinderConfig) -> Result<EventInfo> {
    find_events_raw(series.discharge(), series.rainfall(), config)
}

/// Find recession events in raw discharge/rainfall slices.
///
/// Fails with [`Error::InvalidInput`] when `rainfall` and `discharge` differ in
/// length. Missing (`NaN`) samples never belong to an event; an all-missing
/// series yields no events.
pub fn find_events_raw(
    discharge: &[f64],
    rainfall: Option<&[f64]>,
    config: &EventFinderConfig,
) -> Result<EventInfo> {
    let n = discharge.len();
    if let Some(r) = rainfall {
        if r.len() != n {
            return Err(Error::InvalidInput(format!(
                "rainfall and discharge length mismatch: {} != {}",
                r.len(),
                n
            )));
        }
    }
    if n < 2 {
        return Ok(EventInfo { keep: vec![false; n], ..Default::default() });
    }

    // First difference per step j (between samples j and j+1).
    let dq: Vec<f64> = discharge.windows(2).map(|w| w[1] - w[0]).collect();
    // Second difference per interior sample; NaN at the boundaries.
    let mut d2 = vec![f64::NAN; n];
    for i in 1..n - 1 {
        d2[i] = discharge[i + 1] - 2.0 * discharge[i] + discharge[i - 1];
    }

    let (imax, imin) = local_extrema(&dq);
    let iconvex: Vec<usize> = (0..n).filter(|&i| d2[i].is_finite() && d2[i] >= 0.0).collect();

    let decreasing = |d: f64| match config.zero_derivative {
        ZeroDerivative::Increasing => d < 0.0,
        ZeroDerivative::Decreasing => d <= 0.0,
    };
    let rain_ok = |j: usize| match rainfall {
        Some(r) if config.exclude_rain => !(r[j + 1] > config.rain_threshold),
        _ => true,
    };
    let convex_ok = |j: usize| {
        let i = j + 1;
        !config.require_convex || i == n - 1 || !(d2[i] < 0.0)
    };

    let step_mask: Vec<bool> = dq
        .iter()
        .enumerate()
        .map(|(j, &d)| d.is_finite() && decreasing(d) && rain_ok(j) && convex_ok(j))
        .collect();

    // k steps span k+1 samples.
    let runs = is_min_length(&step_mask, config.min_run_length.saturating_sub(1));

    let mut istart = Vec::with_capacity(runs.len());
    let mut istop = Vec::with_capacity(runs.len());
    for (s, e) in runs.spans() {
        // Flat steps only count as part of a recession that actually falls.
        if !dq[s..=e].iter().any(|&d| d < 0.0) {
            continue;
        }
        let window = &discharge[s..=e + 1];
        let (start, stop) = refine_span(window);
        let (start, stop) = (s + start, s + stop);
        if stop >= start && stop - start + 1 >= config.min_run_length {
            istart.push(start);
            istop.push(stop);
        }
    }

    let mut keep = vec![false; n];
    for (&s, &e) in istart.iter().zip(&istop) {
        keep[s..=e].fill(true);
    }

    log::debug!(
        "event finder: {} samples, {} candidate runs, {} events kept",
        n,
        runs.len(),
        istart.len()
    );

    Ok(EventInfo { istart, istop, imax, imin, iconvex, keep, n_candidates: runs.len() })
}

/// Last position of the window maximum and first position of the minimum.
fn refine_span(window: &[f64]) -> (usize, usize) {
    let mut imax = 0;
    let mut imin = 0;
    for (i, &v) in window.iter().enumerate() {
        if v >= window[imax] {
            imax = i;
        }
        if v < window[imin] {
            imin = i;
        }
    }
    (imax, imin)
}

/// Local maxima and minima from the sign pattern of the first difference.
fn local_extrema(dq: &[f64]) -> (Vec<usize>, Vec<usize>) {
    let n = dq.len() + 1;
    let mut imax = Vec::new();
    let mut imin = Vec::new();
    for i in 0..n {
        let before = if i == 0 { None } else { Some(dq[i - 1]) };
        let after = if i == n - 1 { None } else { Some(dq[i]) };
        match (before, after) {
            (None, Some(a)) if a < 0.0 => imax.push(i),
            (None, Some(a)) if a > 0.0 => imin.push(i),
            (Some(b), None) if b > 0.0 => imax.push(i),
            (Some(b), None) if b < 0.0 => imin.push(i),
            (Some(b), Some(a)) if b >= 0.0 && a < 0.0 => imax.push(i),
            (Some(b), Some(a)) if b < 0.0 && a >= 0.0 => imin.push(i),
            _ => {}
        }
    }
    (imax, imin)
}

/// Cut the kept events out of `series`.
pub fn extract_events(series: &TimeSeries, info: &EventInfo) -> Vec<Event> {
    let time = series.time();
    let q = series.discharge();
    let r = series.rainfall();
    info.spans()
        .enumerate()
        .map(|(index, (s, e))| {
            let t0 = time[s];
            Event {
                index,
                istart: s,
                istop: e,
                t: time[s..=e].iter().map(|t| t - t0).collect(),
                q: q[s..=e].to_vec(),
                r: r.map(|r| r[s..=e].to_vec()),
            }
        })
        .collect()
}
