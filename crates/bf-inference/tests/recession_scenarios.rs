//! End-to-end recession analysis scenarios.
//!
//! - single exponential recession (linear reservoir)
//! - inconsistent basin geometry
//! - rain-split recession
//! - nonlinear (b = 2) population recovery and forward round trip
//! - bootstrap bounds and reproducibility
//! - mm/day and m³/day inputs of the same basin agree
//! - known drainable porosity yields an aquifer thickness

use approx::assert_relative_eq;
use bf_core::{BasinGeometry, TimeSeries};
use bf_inference::recession::q_nonlin;
use bf_inference::{
    AnalysisConfig, DischargeUnits, EventFitStatus, ExponentSource, Notice, PhiMethod, analyze,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn exponential_series(rain: Option<Vec<f64>>) -> TimeSeries {
    let q: Vec<f64> = (0..=100).map(|t| 100.0 * (-0.05 * t as f64).exp()).collect();
    TimeSeries::uniform(1.0, q, rain).unwrap()
}

/// Back-to-back recessions `-dQ/dt = 0.01 Q²`, each 60 days long, starting
/// from increasing peaks.
fn hyperbolic_series(n_events: usize) -> TimeSeries {
    let mut q = Vec::with_capacity(60 * n_events);
    for e in 0..n_events {
        let q0 = 10.0 + e as f64;
        q.extend((0..60).map(|t| q_nonlin(q0, 0.01, 2.0, t as f64)));
    }
    TimeSeries::uniform(1.0, q, None).unwrap()
}

fn scaled(series: &TimeSeries, factor: f64) -> TimeSeries {
    let q = series.discharge().iter().map(|v| v * factor).collect();
    TimeSeries::uniform(1.0, q, None).unwrap()
}

/// 1 km² basin, 2 km of streams, 2 m deep aquifer.
fn basin() -> BasinGeometry {
    BasinGeometry {
        area: Some(1.0e6),
        drainage_density: Some(2.0),
        stream_length: Some(2000.0),
        aquifer_depth: Some(2.0),
        slope: None,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn single_exponential_recession() {
    let series = exponential_series(Some(vec![0.0; 101]));
    let out = analyze(&series, &AnalysisConfig::default()).unwrap();

    assert_eq!(out.info.n_events(), 1);
    assert_eq!(out.events[0].len(), 101);
    assert_eq!((out.info.istart[0], out.info.istop[0]), (0, 100));

    let fit = &out.fits[0];
    assert_eq!(fit.status, EventFitStatus::Fitted);
    assert_relative_eq!(fit.gamma, 0.05, max_relative = 0.01);

    let g = out.global.expect("population fit");
    assert!((g.b - 1.0).abs() < 0.05, "b = {}", g.b);
    assert_relative_eq!(g.a, 0.05, max_relative = 0.05);
    assert!(g.b_l <= g.b && g.b <= g.b_h);
}

#[test]
fn inconsistent_geometry_is_corrected_not_fatal() {
    let mut cfg = AnalysisConfig::default();
    cfg.geometry = BasinGeometry {
        area: Some(1.0e6),
        drainage_density: Some(2.0),
        stream_length: Some(750.0),
        ..Default::default()
    };
    let out = analyze(&exponential_series(None), &cfg).unwrap();
    let g = out.global.expect("population fit");
    assert_eq!(g.geometry.stream_length, Some(2000.0));
    assert!(g.notices.contains(&Notice::StreamLengthRecomputed { supplied: 750.0, recomputed: 2000.0 }));
}

#[test]
fn rainfall_splits_a_recession() {
    let mut rain = vec![0.0; 101];
    rain[50] = 3.0;
    let out = analyze(&exponential_series(Some(rain.clone())), &AnalysisConfig::default()).unwrap();
    assert_eq!(out.info.istart, vec![0, 50]);
    assert_eq!(out.info.istop, vec![49, 100]);

    let mut cfg = AnalysisConfig::default();
    cfg.events.exclude_rain = false;
    let out = analyze(&exponential_series(Some(rain)), &cfg).unwrap();
    assert_eq!(out.info.n_events(), 1);
}

#[test]
fn nonlinear_population_round_trip() {
    // Too few events for a tail fit: b comes from the cloud regression.
    let mut cfg = AnalysisConfig::default();
    cfg.global.min_tail_events = 50;
    let out = analyze(&hyperbolic_series(20), &cfg).unwrap();
    assert_eq!(out.info.n_events(), 20);
    assert!(out.fits.iter().all(|f| f.status == EventFitStatus::Fitted));

    let g = out.global.expect("population fit");
    assert_eq!(g.b_source, ExponentSource::PointCloud);
    assert!((g.b - 2.0).abs() < 0.1, "b = {}", g.b);
    assert_relative_eq!(g.a, 0.01, max_relative = 0.15);

    // The fitted law reproduces every event from its first sample.
    for event in &out.events {
        for (&t, &q) in event.t.iter().zip(&event.q) {
            let model = q_nonlin(event.q[0], g.a, g.b, t);
            assert_relative_eq!(model, q, max_relative = 0.1);
        }
    }
}

#[test]
fn bootstrap_bounds_contain_estimate_and_reproduce() {
    let mut cfg = AnalysisConfig::default();
    cfg.global.bootstrap = true;
    cfg.global.n_reps = 60;
    cfg.global.seed = 2024;
    let series = hyperbolic_series(12);

    let g1 = analyze(&series, &cfg).unwrap().global.unwrap();
    let g2 = analyze(&series, &cfg).unwrap().global.unwrap();
    assert!(g1.bootstrap);
    assert!(g1.b_l <= g1.b && g1.b <= g1.b_h);
    assert!(g1.a_l <= g1.a && g1.a <= g1.a_h);
    assert_eq!(g1.b_l.to_bits(), g2.b_l.to_bits());
    assert_eq!(g1.b_h.to_bits(), g2.b_h.to_bits());
    assert_eq!(g1.a_l.to_bits(), g2.a_l.to_bits());
    assert_eq!(g1.a_h.to_bits(), g2.a_h.to_bits());

    cfg.global.seed = 2025;
    let g3 = analyze(&series, &cfg).unwrap().global.unwrap();
    assert!(g3.b_l <= g3.b && g3.b <= g3.b_h);
}

#[test]
fn population_exponent_comes_from_tau_tail() {
    let out = analyze(&hyperbolic_series(20), &AnalysisConfig::default()).unwrap();
    let g = out.global.expect("population fit");
    assert_eq!(g.b_source, ExponentSource::TauTail);
    let alpha = g.alpha.expect("tail exponent");
    assert_relative_eq!(g.b, alpha / (alpha - 1.0), max_relative = 1e-12);
    assert!((g.b_cloud - 2.0).abs() < 0.1, "cloud slope = {}", g.b_cloud);
}

#[test]
fn discharge_units_do_not_change_porosity_or_conductivity() {
    // Q[mm/day] · A / 1000 = Q[m³/day] with A = 1e6 m².
    let per_area = hyperbolic_series(12);
    let volumetric = scaled(&per_area, 1.0e6 / 1000.0);

    for method in [PhiMethod::PointCloud, PhiMethod::PhiCombo] {
        let mut cfg = AnalysisConfig::default();
        cfg.geometry = basin();
        cfg.global.phi_method = method;
        let g_m3 = analyze(&volumetric, &cfg).unwrap().global.unwrap();
        cfg.global.discharge_units = DischargeUnits::MillimetersPerDay;
        let g_mm = analyze(&per_area, &cfg).unwrap().global.unwrap();

        assert!(!g_mm.notices.contains(&Notice::UnitsNotConverted));
        assert_relative_eq!(g_mm.b, g_m3.b, max_relative = 1e-6);
        let (phi_m3, phi_mm) = (g_m3.phi.unwrap().median, g_mm.phi.unwrap().median);
        assert_relative_eq!(phi_mm, phi_m3, max_relative = 1e-3);
        let (aq_m3, aq_mm) = (g_m3.aquifer.unwrap(), g_mm.aquifer.unwrap());
        assert_relative_eq!(aq_mm.k_early.unwrap(), aq_m3.k_early.unwrap(), max_relative = 1e-3);
        assert_relative_eq!(aq_mm.k_late.unwrap(), aq_m3.k_late.unwrap(), max_relative = 1e-3);
    }
}

#[test]
fn per_area_discharge_without_area_is_flagged() {
    let mut cfg = AnalysisConfig::default();
    cfg.global.discharge_units = DischargeUnits::MillimetersPerDay;
    let g = analyze(&hyperbolic_series(12), &cfg).unwrap().global.unwrap();
    assert!(g.notices.contains(&Notice::UnitsNotConverted));
    assert!(g.phi.is_none());
    assert!(g.aquifer.is_none());
}

#[test]
fn drainable_porosity_yields_thickness() {
    let mut cfg = AnalysisConfig::default();
    cfg.geometry = BasinGeometry { aquifer_depth: None, stream_length: None, ..basin() };
    cfg.global.drainable_porosity = Some(0.1);
    let g = analyze(&hyperbolic_series(12), &cfg).unwrap().global.unwrap();

    assert_eq!(g.geometry.stream_length, Some(2000.0));
    assert!(g.notices.contains(&Notice::StreamLengthDerived { value: 2000.0 }));
    let aquifer = g.aquifer.expect("aquifer inversion");
    let thickness = aquifer.thickness.expect("thickness");
    assert!(thickness > 0.0);
    assert_eq!(aquifer.depth, Some(thickness));
    assert_eq!(aquifer.phi, Some(0.1));
    assert!(aquifer.k_early.unwrap() > 0.0);
    assert!(aquifer.k_late.unwrap() > 0.0);
}

#[test]
fn all_increasing_series_has_no_events() {
    let series = TimeSeries::uniform(1.0, vec![1.0, 2.0, 3.0, 4.0, 5.0], None).unwrap();
    let out = analyze(&series, &AnalysisConfig::default()).unwrap();
    assert!(out.info.is_empty());
    assert!(out.global.is_none());
}
