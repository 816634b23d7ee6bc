//! # bf-inference
//!
//! Recession analysis for baseflow.
//!
//! This crate provides:
//! - recession event detection on discharge/rainfall series
//! - per-event fits with the exponential time-step method
//! - the population fit of `-dQ/dt = aQ^b` with optional bootstrap bounds
//! - porosity strategies and closed-form aquifer inversions
//!
//! ## Architecture
//!
//! Every stage is a function from borrowed inputs to a new value record;
//! [`pipeline::analyze`] composes them.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Basin geometry checks and aquifer inversions.
pub mod aquifer;
/// Bootstrap percentile intervals.
pub mod bootstrap_ci;
/// Typed analysis configuration.
pub mod config;
/// Exponential time-step fit of single events.
pub mod event_fit;
/// Recession event detection.
pub mod events;
/// Whole-event exponential decay fits.
pub mod expfit;
/// Population fit.
pub mod global_fit;
/// Straight-line least squares.
pub mod linfit;
/// Non-fatal notifications.
pub mod notice;
/// Generic numerical optimizer (L-BFGS backend).
pub mod optimizer;
/// Porosity strategies.
pub mod phi;
/// End-to-end pipeline.
pub mod pipeline;
/// Pooled point cloud and fixed-slope intercepts.
pub mod pointcloud;
/// Closed-form power-law recession model.
pub mod recession;
/// Minimum-length run filter.
pub mod runlength;

pub use aquifer::AquiferProperties;
pub use config::{
    AnalysisConfig, DischargeUnits, EventFinderConfig, EventFitConfig, GlobalFitConfig, PhiMethod,
    ZeroDerivative,
};
pub use event_fit::{EventFit, EventFitStatus, fit_event, fit_events};
pub use events::{Event, EventInfo, extract_events, find_events};
pub use global_fit::{ExponentSource, GlobalFit, fit_global};
pub use notice::Notice;
pub use optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizationResult, OptimizerConfig};
pub use phi::PhiEstimate;
pub use pipeline::{Analysis, analyze};
pub use pointcloud::PointCloud;
pub use recession::PowerLaw;
pub use runlength::{Runs, is_min_length};
