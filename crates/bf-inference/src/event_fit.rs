//! Per-event fit with the exponential time-step (ETS) method.
//!
//! 1. A whole-event exponential fit gives the decay rate γ.
//! 2. At each sample `n` a window of `m(n) + 1` samples is fitted by OLS;
//!    `m(n) = 1 + ceil(f · (N-1) · exp(-1/(γ t_n)))` grows from one step at
//!    the event start towards `f` of the event length.
//! 3. Windows that rise, fit worse than their mean (r² <= 0) or contain
//!    non-positive discharge are discarded; the rest are interpolated back
//!    onto the sample times.
//! 4. Optionally `-dQ/dt = aQ^b` is fitted to the window values.
//!
//! Failures are recorded in [`EventFitStatus`] and never escape.

use bf_prob::math::{interp_linear, nanmean, nanmedian};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::EventFitConfig;
use crate::events::Event;
use crate::expfit::{ExpFit, fit_exponential};
use crate::linfit::ols;
use crate::recession::{PowerLaw, fit_power_law};

/// Outcome of fitting one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFitStatus {
    /// Windows and power law fitted.
    Fitted,
    /// Windows fitted; power law not requested or not enough points.
    NoPowerLaw,
    /// Too few valid windows, or inconsistent sample lengths; all outputs missing.
    Degenerate,
    /// No exponential strategy produced a decay rate; all outputs missing.
    ExpFitFailed,
}

/// One surviving ETS window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EtsWindow {
    /// First sample of the window.
    pub start: usize,
    /// Last sample (inclusive).
    pub end: usize,
    /// Window-center time.
    pub tq: f64,
    /// Window duration.
    pub dt: f64,
    /// Mean discharge.
    pub q: f64,
    /// OLS slope (< 0).
    pub dqdt: f64,
    /// Mean rainfall (`NaN` without rainfall).
    pub rq: f64,
    /// OLS r² (> 0).
    pub rsq: f64,
}

/// Fitted quantities of one event.
///
/// Per-sample vectors have the event's length and hold `NaN` wherever no
/// surviving window covers the sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFit {
    /// Position of the event in the event list.
    pub event_index: usize,
    /// Elapsed time of each sample.
    pub t: Vec<f64>,
    /// Smoothed discharge.
    pub q: Vec<f64>,
    /// Discharge derivative.
    pub dqdt: Vec<f64>,
    /// Window duration.
    pub dt: Vec<f64>,
    /// Window-center time interpolated onto the samples. Window centers are
    /// the interpolation nodes, so a covered sample gets its own time.
    pub tq: Vec<f64>,
    /// Window mean rainfall.
    pub rq: Vec<f64>,
    /// Window r².
    pub rsq: Vec<f64>,
    /// Surviving windows, in time order.
    pub windows: Vec<EtsWindow>,
    /// Decay rate used to size the windows.
    pub gamma: f64,
    /// Whole-event exponential fit.
    pub exp_fit: Option<ExpFit>,
    /// Per-event power law.
    pub power_law: Option<PowerLaw>,
    /// Characteristic timescale of the event.
    pub tau: f64,
    /// Outcome.
    pub status: EventFitStatus,
}

impl EventFit {
    fn missing(event: &Event, exp_fit: Option<ExpFit>, status: EventFitStatus) -> Self {
        let nan = vec![f64::NAN; event.len()];
        Self {
            event_index: event.index,
            t: event.t.clone(),
            q: nan.clone(),
            dqdt: nan.clone(),
            dt: nan.clone(),
            tq: nan.clone(),
            rq: nan.clone(),
            rsq: nan,
            windows: Vec::new(),
            gamma: exp_fit.map_or(f64::NAN, |f| f.gamma),
            exp_fit,
            power_law: None,
            tau: f64::NAN,
            status,
        }
    }

    /// True when the windows can feed the population fit.
    pub fn is_usable(&self) -> bool {
        matches!(self.status, EventFitStatus::Fitted | EventFitStatus::NoPowerLaw)
    }

    /// Window discharges.
    pub fn window_q(&self) -> Vec<f64> {
        self.windows.iter().map(|w| w.q).collect()
    }

    /// Window derivatives.
    pub fn window_dqdt(&self) -> Vec<f64> {
        self.windows.iter().map(|w| w.dqdt).collect()
    }
}

/// Window extent `m(n)` in samples beyond `n` (may be non-finite).
#[inline]
pub fn window_length(gamma: f64, t_n: f64, n_samples: usize, window_fraction: f64) -> f64 {
    let span = n_samples.saturating_sub(1) as f64;
    1.0 + (window_fraction * span * (-1.0 / (gamma * t_n)).exp()).ceil()
}

/// Slide the adaptive windows over an event and keep the valid ones.
pub fn ets_windows(event: &Event, gamma: f64, window_fraction: f64) -> Vec<EtsWindow> {
    let n_samples = event.len();
    let mut out = Vec::with_capacity(n_samples);
    for n in 0..n_samples {
        let m = window_length(gamma, event.t[n], n_samples, window_fraction);
        if !m.is_finite() {
            break;
        }
        let end = n + m as usize;
        if end >= n_samples {
            break;
        }
        let t = &event.t[n..=end];
        let q = &event.q[n..=end];
        if q.iter().any(|&v| !(v.is_finite() && v > 0.0)) {
            continue;
        }
        let Ok(line) = ols(t, q) else { continue };
        if !(line.slope < 0.0 && line.rsq > 0.0) {
            continue;
        }
        out.push(EtsWindow {
            start: n,
            end,
            tq: nanmean(t),
            dt: t[t.len() - 1] - t[0],
            q: nanmean(q),
            dqdt: line.slope,
            rq: event.r.as_ref().map_or(f64::NAN, |r| nanmean(&r[n..=end])),
            rsq: line.rsq,
        });
    }
    out
}

fn event_tau(windows: &[EtsWindow], power_law: Option<&PowerLaw>) -> f64 {
    let taus: Vec<f64> = match power_law {
        Some(law) => windows.iter().map(|w| law.tau(w.q)).collect(),
        None => windows.iter().map(|w| w.q / -w.dqdt).collect(),
    };
    nanmedian(&taus)
}

/// Fit one event. Never fails; problems end up in [`EventFit::status`].
pub fn fit_event(event: &Event, config: &EventFitConfig) -> EventFit {
    if !event.lengths_match() {
        log::debug!("event {}: time, discharge and rainfall lengths differ", event.index);
        return EventFit::missing(event, None, EventFitStatus::Degenerate);
    }
    let exp_fit = match fit_exponential(&event.t, &event.q, &config.optimizer) {
        Ok(fit) => fit,
        Err(e) => {
            log::debug!("event {}: exponential fit failed: {e}", event.index);
            return EventFit::missing(event, None, EventFitStatus::ExpFitFailed);
        }
    };

    let windows = ets_windows(event, exp_fit.gamma, config.window_fraction);
    if windows.len() < config.min_valid_windows {
        log::debug!(
            "event {}: {} valid windows (< {}), degenerate",
            event.index,
            windows.len(),
            config.min_valid_windows
        );
        return EventFit::missing(event, Some(exp_fit), EventFitStatus::Degenerate);
    }

    let centers: Vec<f64> = windows.iter().map(|w| w.tq).collect();
    let at_samples = |f: fn(&EtsWindow) -> f64| -> Vec<f64> {
        let y: Vec<f64> = windows.iter().map(f).collect();
        event.t.iter().map(|&ti| interp_linear(&centers, &y, ti)).collect()
    };
    let q = at_samples(|w| w.q);
    let dqdt = at_samples(|w| w.dqdt);
    let dt = at_samples(|w| w.dt);
    let rq = at_samples(|w| w.rq);
    let rsq = at_samples(|w| w.rsq);
    let tq = at_samples(|w| w.tq);

    let power_law = if config.fit_power_law {
        let wq: Vec<f64> = windows.iter().map(|w| w.q).collect();
        let wd: Vec<f64> = windows.iter().map(|w| w.dqdt).collect();
        let weights: Option<Vec<f64>> =
            config.weighted.then(|| windows.iter().map(|w| w.rsq).collect());
        match fit_power_law(&wq, &wd, weights.as_deref(), config.min_power_law_points) {
            Ok(law) => Some(law),
            Err(e) => {
                log::debug!("event {}: power law skipped: {e}", event.index);
                None
            }
        }
    } else {
        None
    };

    let status = if power_law.is_some() { EventFitStatus::Fitted } else { EventFitStatus::NoPowerLaw };
    EventFit {
        event_index: event.index,
        t: event.t.clone(),
        q,
        dqdt,
        dt,
        tq,
        rq,
        rsq,
        tau: event_tau(&windows, power_law.as_ref()),
        windows,
        gamma: exp_fit.gamma,
        exp_fit: Some(exp_fit),
        power_law,
        status,
    }
}

/// Fit every event (in parallel; output order follows `events`).
pub fn fit_events(events: &[Event], config: &EventFitConfig) -> Vec<EventFit> {
    let fits: Vec<EventFit> = events.par_iter().map(|e| fit_event(e, config)).collect();
    let n_usable = fits.iter().filter(|f| f.is_usable()).count();
    log::debug!("fitted {} events, {} usable", fits.len(), n_usable);
    fits
}
