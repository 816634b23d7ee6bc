//! Probability building blocks for baseflow.
//!
//! This crate hosts reusable numeric code shared by the analysis stages:
//! - small numeric helpers (NaN-aware quantiles, medians, interpolation)
//! - the continuous Pareto (power-law tail) distribution and its MLE fit
//! - log-normal utilities used by the porosity distribution fit
//! - standard normal quantiles for interval half-widths

pub mod lognormal;
pub mod math;
pub mod normal;
pub mod pareto;
