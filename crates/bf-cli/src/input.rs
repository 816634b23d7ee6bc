//! Series and configuration loading.

use anyhow::{Context, Result};
use bf_core::TimeSeries;
use bf_inference::AnalysisConfig;
use serde::Deserialize;
use std::path::Path;

/// On-disk series: `null` marks a missing sample.
#[derive(Debug, Clone, Deserialize)]
struct SeriesJson {
    time: Vec<f64>,
    discharge: Vec<Option<f64>>,
    #[serde(default)]
    rainfall: Option<Vec<Option<f64>>>,
}

fn fill_missing(v: Vec<Option<f64>>) -> Vec<f64> {
    v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()
}

pub fn read_series(path: &Path) -> Result<TimeSeries> {
    tracing::info!(path = %path.display(), "loading series");
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: SeriesJson = serde_json::from_slice(&bytes)?;
    let series = TimeSeries::new(raw.time, fill_missing(raw.discharge), raw.rainfall.map(fill_missing))?;
    tracing::info!(samples = series.len(), missing = series.n_missing(), "series loaded");
    Ok(series)
}

pub fn read_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: AnalysisConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        // Default: YAML (serde_yaml_ng).
        serde_yaml_ng::from_slice(&bytes)?
    };
    cfg.validate()?;
    Ok(cfg)
}
