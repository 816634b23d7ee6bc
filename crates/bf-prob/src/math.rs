//! Small NaN-aware numeric utilities used across the analysis stages.
//!
//! Missing values travel through the pipeline as `NaN`; every reducer here
//! skips non-finite entries and returns `NaN` when nothing is left.

/// Finite entries of `xs`, in order.
#[inline]
pub fn finite_values(xs: &[f64]) -> Vec<f64> {
    xs.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Mean of the finite entries of `xs`.
pub fn nanmean(xs: &[f64]) -> f64 {
    let (sum, n) = xs
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Median of the finite entries of `xs`.
pub fn nanmedian(xs: &[f64]) -> f64 {
    nanquantile(xs, 0.5)
}

/// Quantile for sorted data via linear interpolation.
///
/// - `q=0` returns min
/// - `q=1` returns max
/// - empty input returns `NaN`
pub fn quantile_linear_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let j = pos.ceil() as usize;
    if i == j {
        return sorted[i];
    }
    let t = pos - i as f64;
    (1.0 - t) * sorted[i] + t * sorted[j]
}

/// Quantile of the finite entries of `xs` (sorting + linear interpolation).
pub fn nanquantile(xs: &[f64], q: f64) -> f64 {
    let mut v = finite_values(xs);
    v.sort_by(f64::total_cmp);
    quantile_linear_sorted(&v, q)
}

/// Linear interpolation of `(x, y)` at `xi`.
///
/// `x` must be strictly increasing. Points outside `[x[0], x[last]]` return
/// `NaN` (no extrapolation).
pub fn interp_linear(x: &[f64], y: &[f64], xi: f64) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    if x.is_empty() || !xi.is_finite() || xi < x[0] || xi > x[x.len() - 1] {
        return f64::NAN;
    }
    // First index with x[j] >= xi.
    let j = x.partition_point(|&v| v < xi);
    if x[j] == xi {
        return y[j];
    }
    let i = j - 1;
    let w = (xi - x[i]) / (x[j] - x[i]);
    (1.0 - w) * y[i] + w * y[j]
}
