//! Typed analysis configuration.
//!
//! One [`AnalysisConfig`] is built (or deserialized) per pipeline invocation
//! and validated once before any stage runs. Every section carries explicit
//! defaults so partial YAML/JSON documents are accepted.

use bf_core::{BasinGeometry, Error, Result};
use serde::{Deserialize, Serialize};

use crate::optimizer::OptimizerConfig;

/// How a zero first difference (flat step) is classified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDerivative {
    /// `dQ >= 0` is increasing: flat steps break a recession.
    #[default]
    Increasing,
    /// `dQ <= 0` is decreasing: flat steps continue a recession.
    Decreasing,
}

/// Event finder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFinderConfig {
    /// Minimum number of samples in a recession event.
    pub min_run_length: usize,
    /// Drop recession steps with concurrent rainfall (when rainfall is supplied).
    pub exclude_rain: bool,
    /// Rainfall above this value contaminates a step.
    pub rain_threshold: f64,
    /// Sign convention for flat steps.
    pub zero_derivative: ZeroDerivative,
    /// Split events at interior concave samples.
    pub require_convex: bool,
}

impl Default for EventFinderConfig {
    fn default() -> Self {
        Self {
            min_run_length: 4,
            exclude_rain: true,
            rain_threshold: 0.0,
            zero_derivative: ZeroDerivative::Increasing,
            require_convex: false,
        }
    }
}

impl EventFinderConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.min_run_length < 2 {
            return Err(Error::InvalidInput(format!(
                "events.min_run_length must be >= 2, got {}",
                self.min_run_length
            )));
        }
        if !(self.rain_threshold.is_finite() && self.rain_threshold >= 0.0) {
            return Err(Error::InvalidInput(format!(
                "events.rain_threshold must be finite and >= 0, got {}",
                self.rain_threshold
            )));
        }
        Ok(())
    }
}

/// Per-event (exponential time-step) fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventFitConfig {
    /// Fraction of the event duration the sliding window may grow to.
    pub window_fraction: f64,
    /// Fit `-dQ/dt = aQ^b` to each event.
    pub fit_power_law: bool,
    /// Use window r² as regression weights.
    pub weighted: bool,
    /// Minimum usable `(q, dQ/dt)` pairs for the per-event power law.
    pub min_power_law_points: usize,
    /// Events with fewer surviving windows are degenerate.
    pub min_valid_windows: usize,
    /// Solver settings for the nonlinear exponential fit.
    pub optimizer: OptimizerConfig,
}

impl Default for EventFitConfig {
    fn default() -> Self {
        Self {
            window_fraction: 0.2,
            fit_power_law: true,
            weighted: true,
            min_power_law_points: 5,
            min_valid_windows: 4,
            optimizer: OptimizerConfig { max_iter: 500, tol: 1e-10, m: 7 },
        }
    }
}

impl EventFitConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.window_fraction.is_finite()
            && self.window_fraction > 0.0
            && self.window_fraction <= 1.0)
        {
            return Err(Error::InvalidInput(format!(
                "fit.window_fraction must be in (0, 1], got {}",
                self.window_fraction
            )));
        }
        if self.min_power_law_points < 3 {
            return Err(Error::InvalidInput(format!(
                "fit.min_power_law_points must be >= 3, got {}",
                self.min_power_law_points
            )));
        }
        if self.min_valid_windows < 1 {
            return Err(Error::InvalidInput("fit.min_valid_windows must be >= 1".to_string()));
        }
        if self.optimizer.max_iter == 0 || self.optimizer.m == 0 {
            return Err(Error::InvalidInput(
                "fit.optimizer.max_iter and fit.optimizer.m must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drainable-porosity estimation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhiMethod {
    /// One sample per point-cloud point against the global early-time intercept.
    #[default]
    PointCloud,
    /// Log-normal fit over the per-event combined samples.
    DistFit,
    /// One sample per event from its own early/late intercepts.
    PhiCombo,
}

/// Units of the discharge series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DischargeUnits {
    /// Volumetric discharge [m³/day].
    #[default]
    CubicMetersPerDay,
    /// Area-normalized discharge [mm/day].
    MillimetersPerDay,
}

/// Population (global) fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalFitConfig {
    /// `(q, -dQ/dt)` quantile pair of the early-time reference point.
    pub early_quantiles: [f64; 2],
    /// `(q, -dQ/dt)` quantile pair of the late-time reference point.
    pub late_quantiles: [f64; 2],
    /// Porosity strategy.
    pub phi_method: PhiMethod,
    /// Minimum events for the τ tail fit.
    pub min_tail_events: usize,
    /// Replace analytic bounds with bootstrap percentile bounds.
    pub bootstrap: bool,
    /// Bootstrap replicates.
    pub n_reps: usize,
    /// Bootstrap RNG seed.
    pub seed: u64,
    /// Confidence level for `b_L/b_H`, `a_L/a_H`.
    pub conf_level: f64,
    /// Units of the discharge series.
    pub discharge_units: DischargeUnits,
    /// Relative tolerance of the stream length / drainage density check.
    pub geometry_tolerance: f64,
    /// Known drainable porosity, used to infer aquifer thickness.
    pub drainable_porosity: Option<f64>,
}

impl Default for GlobalFitConfig {
    fn default() -> Self {
        Self {
            early_quantiles: [0.90, 0.90],
            late_quantiles: [0.50, 0.50],
            phi_method: PhiMethod::PointCloud,
            min_tail_events: 5,
            bootstrap: false,
            n_reps: 1000,
            seed: 42,
            conf_level: 0.95,
            discharge_units: DischargeUnits::CubicMetersPerDay,
            geometry_tolerance: 0.01,
            drainable_porosity: None,
        }
    }
}

impl GlobalFitConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        for (name, pair) in [("early_quantiles", self.early_quantiles), ("late_quantiles", self.late_quantiles)]
        {
            if pair.iter().any(|p| !(p.is_finite() && (0.0..=1.0).contains(p))) {
                return Err(Error::InvalidInput(format!(
                    "global.{name} must lie in [0, 1], got {pair:?}"
                )));
            }
        }
        if self.min_tail_events < 2 {
            return Err(Error::InvalidInput(format!(
                "global.min_tail_events must be >= 2, got {}",
                self.min_tail_events
            )));
        }
        if self.bootstrap && self.n_reps < 2 {
            return Err(Error::InvalidInput(format!(
                "global.n_reps must be >= 2 when bootstrapping, got {}",
                self.n_reps
            )));
        }
        if !(self.conf_level.is_finite() && self.conf_level > 0.0 && self.conf_level < 1.0) {
            return Err(Error::InvalidInput(format!(
                "global.conf_level must be in (0, 1), got {}",
                self.conf_level
            )));
        }
        if !(self.geometry_tolerance.is_finite() && self.geometry_tolerance >= 0.0) {
            return Err(Error::InvalidInput(format!(
                "global.geometry_tolerance must be finite and >= 0, got {}",
                self.geometry_tolerance
            )));
        }
        if let Some(phi) = self.drainable_porosity {
            if !(phi.is_finite() && phi > 0.0 && phi <= 1.0) {
                return Err(Error::InvalidInput(format!(
                    "global.drainable_porosity must be in (0, 1], got {phi}"
                )));
            }
        }
        Ok(())
    }
}

/// Complete configuration of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Event finder settings.
    pub events: EventFinderConfig,
    /// Per-event fit settings.
    pub fit: EventFitConfig,
    /// Population fit settings.
    pub global: GlobalFitConfig,
    /// Basin geometry for the aquifer inversions.
    pub geometry: BasinGeometry,
}

impl AnalysisConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.events.validate()?;
        self.fit.validate()?;
        self.global.validate()?;
        self.geometry.validate()
    }
}
