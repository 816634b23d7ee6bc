//! Basin geometry checks and closed-form aquifer inversions.
//!
//! Early-time (b = 3) and late-time (b = 1) solutions of the Boussinesq
//! equation for a horizontal aquifer of depth `D` draining into streams of
//! total length `L` over area `A`:
//!
//! ```text
//! a1 = 1.133 / (k φ² D³ L²)
//! a2 = π² k D L² / (φ A²)
//! ```
//!
//! Eliminating `k` gives the porosity `φ = (1.133 π² / (a1 a2 A² D²))^(1/3)`.
//! Discharge must be volumetric (m³/day); see [`to_volumetric`].

use std::f64::consts::PI;

use bf_core::BasinGeometry;
use serde::Serialize;

use crate::notice::Notice;

/// Brutsaert–Nieber early-time constant.
pub const EARLY_CONSTANT: f64 = 1.133;

/// Make stream length and drainage density agree.
///
/// `L` is compared with `Dd·A/1000` at relative tolerance `tolerance`; a
/// mismatch replaces `L`. Missing `L` or `Dd` is filled in when the other two
/// quantities are known.
pub fn reconcile_geometry(geometry: &BasinGeometry, tolerance: f64) -> (BasinGeometry, Vec<Notice>) {
    let mut g = *geometry;
    let mut notices = Vec::new();
    match (g.drainage_density, g.area, g.stream_length) {
        (Some(dd), Some(area), supplied) => {
            let expected = dd * area / 1000.0;
            match supplied {
                Some(l) if (l - expected).abs() <= tolerance * expected => {}
                Some(l) => {
                    log::warn!(
                        "stream length {l} m inconsistent with drainage density {dd}/km over {area} m²; using {expected} m"
                    );
                    g.stream_length = Some(expected);
                    notices.push(Notice::StreamLengthRecomputed { supplied: l, recomputed: expected });
                }
                None => {
                    log::debug!("stream length derived from drainage density: {expected} m");
                    g.stream_length = Some(expected);
                    notices.push(Notice::StreamLengthDerived { value: expected });
                }
            }
        }
        (None, Some(area), Some(l)) => {
            let dd = 1000.0 * l / area;
            g.drainage_density = Some(dd);
            notices.push(Notice::DrainageDensityDerived { value: dd });
        }
        _ => {}
    }
    (g, notices)
}

/// Convert an intercept fitted on mm/day discharge to m³/day.
#[inline]
pub fn to_volumetric(a: f64, b: f64, area: f64) -> f64 {
    a * (area / 1000.0).powf(1.0 - b)
}

/// Porosity from early and late intercepts. Without `depth` the result is
/// the depth-normalized strength `φ·D^(2/3)`.
pub fn phi_combo(a1: f64, a2: f64, area: f64, depth: Option<f64>) -> f64 {
    let d2 = depth.map_or(1.0, |d| d * d);
    (EARLY_CONSTANT * PI * PI / (a1 * a2 * area * area * d2)).cbrt()
}

/// Conductivity from the early-time intercept.
pub fn k_early(a1: f64, phi: f64, depth: f64, stream_length: f64) -> f64 {
    EARLY_CONSTANT / (a1 * phi * phi * depth.powi(3) * stream_length * stream_length)
}

/// Conductivity from the late-time intercept.
pub fn k_late(a2: f64, phi: f64, area: f64, depth: f64, stream_length: f64) -> f64 {
    a2 * phi * area * area / (PI * PI * depth * stream_length * stream_length)
}

/// Active-layer thickness for a known porosity.
pub fn thickness(a1: f64, a2: f64, phi: f64, area: f64) -> f64 {
    (EARLY_CONSTANT * PI * PI / (a1 * a2 * phi.powi(3) * area * area)).sqrt()
}

/// Aquifer properties derived from the population intercepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AquiferProperties {
    /// Porosity used in the inversions.
    pub phi: Option<f64>,
    /// Aquifer depth used (supplied, or inferred thickness).
    pub depth: Option<f64>,
    /// Inferred active-layer thickness (only when depth was unknown).
    pub thickness: Option<f64>,
    /// Conductivity from `a1` [m/day].
    pub k_early: Option<f64>,
    /// Conductivity from `a2` [m/day].
    pub k_late: Option<f64>,
}

fn positive(v: f64) -> Option<f64> {
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Run the inversions that the available inputs allow.
///
/// `phi_estimate` is the porosity inferred from the recession data (only
/// meaningful with a known depth); `drainable_porosity` a caller-supplied
/// value, which also unlocks the thickness inversion.
pub fn invert(
    a1: f64,
    a2: f64,
    phi_estimate: Option<f64>,
    drainable_porosity: Option<f64>,
    geometry: &BasinGeometry,
) -> AquiferProperties {
    let mut out = AquiferProperties::default();
    let thickness = match (geometry.aquifer_depth, drainable_porosity, geometry.area) {
        (None, Some(phi), Some(area)) => positive(thickness(a1, a2, phi, area)),
        _ => None,
    };
    out.thickness = thickness;
    out.depth = geometry.aquifer_depth.or(thickness);
    out.phi = match geometry.aquifer_depth {
        Some(_) => phi_estimate.or(drainable_porosity),
        None => drainable_porosity,
    };

    if let (Some(phi), Some(depth), Some(length)) = (out.phi, out.depth, geometry.stream_length) {
        out.k_early = positive(k_early(a1, phi, depth, length));
        if let Some(area) = geometry.area {
            out.k_late = positive(k_late(a2, phi, area, depth, length));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // k = 1 m/day, φ = 0.1, D = 2 m, L = 2000 m, A = 1e6 m².
    fn synthetic() -> (f64, f64, BasinGeometry) {
        let (k, phi, d, l, area) = (1.0, 0.1, 2.0, 2000.0, 1.0e6);
        let a1 = EARLY_CONSTANT / (k * phi * phi * d * d * d * l * l);
        let a2 = PI * PI * k * d * l * l / (phi * area * area);
        let geometry = BasinGeometry {
            area: Some(area),
            aquifer_depth: Some(d),
            stream_length: Some(l),
            drainage_density: Some(2.0),
            slope: None,
        };
        (a1, a2, geometry)
    }

    #[test]
    fn inversions_recover_synthetic_aquifer() {
        let (a1, a2, g) = synthetic();
        let phi = phi_combo(a1, a2, g.area.unwrap(), g.aquifer_depth);
        assert_relative_eq!(phi, 0.1, max_relative = 1e-10);
        let props = invert(a1, a2, Some(phi), None, &g);
        assert_relative_eq!(props.k_early.unwrap(), 1.0, max_relative = 1e-10);
        assert_relative_eq!(props.k_late.unwrap(), 1.0, max_relative = 1e-10);
        assert!(props.thickness.is_none());
    }

    #[test]
    fn thickness_from_known_porosity() {
        let (a1, a2, mut g) = synthetic();
        g.aquifer_depth = None;
        let props = invert(a1, a2, None, Some(0.1), &g);
        assert_relative_eq!(props.thickness.unwrap(), 2.0, max_relative = 1e-10);
        assert_relative_eq!(props.k_late.unwrap(), 1.0, max_relative = 1e-10);
        // Depth-normalized strength φ·D^(2/3).
        let strength = phi_combo(a1, a2, g.area.unwrap(), None);
        assert_relative_eq!(strength, 0.1 * 2.0f64.powf(2.0 / 3.0), max_relative = 1e-10);
    }

    #[test]
    fn missing_inputs_leave_gaps() {
        let (a1, a2, mut g) = synthetic();
        g.stream_length = None;
        let props = invert(a1, a2, Some(0.1), None, &g);
        assert!(props.k_early.is_none() && props.k_late.is_none());
        assert_eq!(props.phi, Some(0.1));
    }

    #[test]
    fn inconsistent_stream_length_is_recomputed() {
        let g = BasinGeometry {
            area: Some(1.0e6),
            drainage_density: Some(2.0),
            stream_length: Some(5000.0),
            ..Default::default()
        };
        let (fixed, notices) = reconcile_geometry(&g, 0.01);
        assert_eq!(fixed.stream_length, Some(2000.0));
        assert_eq!(
            notices,
            vec![Notice::StreamLengthRecomputed { supplied: 5000.0, recomputed: 2000.0 }]
        );
    }

    #[test]
    fn consistent_geometry_is_untouched() {
        let g = BasinGeometry {
            area: Some(1.0e6),
            drainage_density: Some(2.0),
            stream_length: Some(2010.0),
            ..Default::default()
        };
        let (fixed, notices) = reconcile_geometry(&g, 0.01);
        assert_eq!(fixed, g);
        assert!(notices.is_empty());
    }

    #[test]
    fn missing_geometry_is_derived() {
        let g = BasinGeometry { area: Some(1.0e6), drainage_density: Some(2.0), ..Default::default() };
        let (fixed, notices) = reconcile_geometry(&g, 0.01);
        assert_eq!(fixed.stream_length, Some(2000.0));
        assert_eq!(notices, vec![Notice::StreamLengthDerived { value: 2000.0 }]);

        let g = BasinGeometry { area: Some(1.0e6), stream_length: Some(3000.0), ..Default::default() };
        let (fixed, _) = reconcile_geometry(&g, 0.01);
        assert_eq!(fixed.drainage_density, Some(3.0));
    }

    #[test]
    fn unit_conversion() {
        // -dq/dt = a q^b in mm/day; Q = c q in m³/day.
        let (a, b, area) = (0.01, 2.0, 5.0e6);
        let c = area / 1000.0;
        let q: f64 = 3.0;
        let rate_vol = c * a * q.powf(b);
        assert_relative_eq!(to_volumetric(a, b, area) * (c * q).powf(b), rate_vol, max_relative = 1e-12);
    }
}
