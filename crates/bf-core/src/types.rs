//! Common data types for baseflow

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Discharge/rainfall record on a strictly increasing time axis.
///
/// Missing samples are stored as `NaN`. The series is validated once on
/// construction and never mutated afterwards; analysis stages borrow it.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    time: Vec<f64>,
    discharge: Vec<f64>,
    rainfall: Option<Vec<f64>>,
}

impl TimeSeries {
    /// Create a validated time series.
    ///
    /// Fails with [`Error::InvalidInput`] on length mismatch, a non-finite or
    /// non-increasing time axis, or negative discharge/rainfall.
    pub fn new(time: Vec<f64>, discharge: Vec<f64>, rainfall: Option<Vec<f64>>) -> Result<Self> {
        if time.len() != discharge.len() {
            return Err(Error::InvalidInput(format!(
                "time and discharge length mismatch: {} != {}",
                time.len(),
                discharge.len()
            )));
        }
        if let Some(r) = &rainfall {
            if r.len() != discharge.len() {
                return Err(Error::InvalidInput(format!(
                    "rainfall and discharge length mismatch: {} != {}",
                    r.len(),
                    discharge.len()
                )));
            }
            if let Some(i) = r.iter().position(|&v| v < 0.0) {
                return Err(Error::InvalidInput(format!(
                    "rainfall must be >= 0, got {} at index {i}",
                    r[i]
                )));
            }
        }
        if let Some(i) = time.iter().position(|t| !t.is_finite()) {
            return Err(Error::InvalidInput(format!("time must be finite (index {i})")));
        }
        if let Some(i) = time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidInput(format!(
                "time axis must be strictly increasing: t[{}]={} <= t[{}]={}",
                i + 1,
                time[i + 1],
                i,
                time[i]
            )));
        }
        if let Some(i) = discharge.iter().position(|&q| q < 0.0 || q == f64::INFINITY) {
            return Err(Error::InvalidInput(format!(
                "discharge must be finite and >= 0, got {} at index {i}",
                discharge[i]
            )));
        }
        Ok(Self { time, discharge, rainfall })
    }

    /// Uniformly sampled series starting at `t = 0` with step `dt`.
    pub fn uniform(dt: f64, discharge: Vec<f64>, rainfall: Option<Vec<f64>>) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::InvalidInput(format!("dt must be finite and > 0, got {dt}")));
        }
        let time = (0..discharge.len()).map(|i| i as f64 * dt).collect();
        Self::new(time, discharge, rainfall)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.discharge.len()
    }

    /// True when the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.discharge.is_empty()
    }

    /// Time axis.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Discharge values (`NaN` = missing).
    pub fn discharge(&self) -> &[f64] {
        &self.discharge
    }

    /// Rainfall values, if supplied.
    pub fn rainfall(&self) -> Option<&[f64]> {
        self.rainfall.as_deref()
    }

    /// Number of missing discharge samples.
    pub fn n_missing(&self) -> usize {
        self.discharge.iter().filter(|q| q.is_nan()).count()
    }
}

/// Basin geometry used by the aquifer inversions.
///
/// Units: area in m², aquifer depth in m, stream length in m, drainage
/// density in 1/km, slope in m/m. Unknown values are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasinGeometry {
    /// Basin area [m²].
    pub area: Option<f64>,
    /// Aquifer (active layer) depth [m].
    pub aquifer_depth: Option<f64>,
    /// Total stream length [m].
    pub stream_length: Option<f64>,
    /// Drainage density [1/km].
    pub drainage_density: Option<f64>,
    /// Mean aquifer slope [m/m].
    pub slope: Option<f64>,
}

impl BasinGeometry {
    /// Reject non-finite or non-positive lengths and negative slope.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("area", self.area),
            ("aquifer_depth", self.aquifer_depth),
            ("stream_length", self.stream_length),
            ("drainage_density", self.drainage_density),
        ];
        for (name, v) in positive {
            if let Some(v) = v {
                if !(v.is_finite() && v > 0.0) {
                    return Err(Error::InvalidInput(format!(
                        "{name} must be finite and > 0, got {v}"
                    )));
                }
            }
        }
        if let Some(s) = self.slope {
            if !(s.is_finite() && s >= 0.0) {
                return Err(Error::InvalidInput(format!("slope must be finite and >= 0, got {s}")));
            }
        }
        Ok(())
    }

    /// Mean hillslope length `B = A / (2L)` [m], when area and stream length are known.
    pub fn hillslope_length(&self) -> Option<f64> {
        Some(self.area? / (2.0 * self.stream_length?))
    }
}
