//! Non-fatal notifications attached to a population fit.

use serde::Serialize;

/// Something the caller should know about a [`crate::GlobalFit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Supplied stream length disagreed with `Dd·A/1000` and was replaced.
    StreamLengthRecomputed {
        /// Caller value [m].
        supplied: f64,
        /// Value used [m].
        recomputed: f64,
    },
    /// Stream length was missing and derived from drainage density and area.
    StreamLengthDerived {
        /// Value used [m].
        value: f64,
    },
    /// Drainage density was missing and derived from stream length and area.
    DrainageDensityDerived {
        /// Value used [1/km].
        value: f64,
    },
    /// Too few events for the τ tail fit; every point kept.
    TailFitSkipped {
        /// Events with a finite τ.
        n_events: usize,
        /// Why the fit did not run.
        reason: String,
    },
    /// Bootstrap bounds unavailable; analytic bounds reported.
    BootstrapFailed {
        /// Why.
        reason: String,
    },
    /// Discharge in mm/day but no area: intercepts left unconverted.
    UnitsNotConverted,
    /// Porosity estimate skipped.
    PhiUnavailable {
        /// Why.
        reason: String,
    },
    /// Aquifer inversions skipped.
    AquiferUnavailable {
        /// Why.
        reason: String,
    },
}
