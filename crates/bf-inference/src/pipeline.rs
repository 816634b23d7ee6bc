//! End-to-end analysis: find → extract → fit → global fit.

use bf_core::{Result, TimeSeries};
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::event_fit::{EventFit, fit_events};
use crate::events::{Event, EventInfo, extract_events, find_events};
use crate::global_fit::{GlobalFit, fit_global};

/// Everything one analysis run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Event index sets.
    pub info: EventInfo,
    /// Extracted events.
    pub events: Vec<Event>,
    /// Per-event fits, parallel to `events`.
    pub fits: Vec<EventFit>,
    /// Population fit; `None` when no population exponent could be formed.
    pub global: Option<GlobalFit>,
}

/// Run the full recession analysis of `series`.
///
/// Only invalid configuration or input is an error. Event-level failures are
/// recorded on the fits, and a population fit that cannot be formed leaves
/// `global` empty.
pub fn analyze(series: &TimeSeries, config: &AnalysisConfig) -> Result<Analysis> {
    config.validate()?;

    let info = find_events(series, &config.events)?;
    if info.is_empty() {
        log::warn!("no recession events found in {} samples", series.len());
        return Ok(Analysis { info, events: Vec::new(), fits: Vec::new(), global: None });
    }
    let events = extract_events(series, &info);
    let fits = fit_events(&events, &config.fit);

    let global = match fit_global(&fits, &config.global, &config.geometry) {
        Ok(g) => Some(g),
        Err(e) if !e.is_recoverable() => return Err(e),
        Err(e) => {
            log::warn!("population fit skipped: {e}");
            None
        }
    };
    Ok(Analysis { info, events, fits, global })
}
