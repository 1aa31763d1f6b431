//! Piecewise-linear interpolation and monotone-CDF inversion.
//!
//! The CDF used for inverse sampling is built from a clipped, non-negative
//! probability mass, so its cumulative sum is non-decreasing by
//! construction. A non-monotone CDF means a negative mass slipped past the
//! upstream clipping; it surfaces as an error instead of being masked by
//! re-sorting.

use crate::errors::{JdfError, Result};

/// `n` evenly spaced values spanning \[a, b\] inclusive.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            (0..n).map(|i| a + step * i as f64).collect()
        }
    }
}

/// Linear interpolation of `(xs, ys)` at `xq`, with `xs` strictly
/// ascending. Queries beyond the grid clamp to the end values.
pub fn lerp_grid(xs: &[f64], ys: &[f64], xq: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    debug_assert!(!xs.is_empty());
    if xq <= xs[0] {
        return ys[0];
    }
    if xq >= xs[xs.len() - 1] {
        return ys[ys.len() - 1];
    }
    let hi = xs.partition_point(|&v| v < xq);
    let lo = hi - 1;
    let width = xs[hi] - xs[lo];
    if width <= 0.0 {
        return ys[lo];
    }
    let t = (xq - xs[lo]) / width;
    ys[lo] + t * (ys[hi] - ys[lo])
}

/// Verifies a cumulative sum is non-decreasing, within a tiny rounding
/// slack. A violation means a negative mass slipped past the upstream
/// clipping and inverse sampling would be meaningless.
pub fn check_non_decreasing(cdf: &[f64]) -> Result<()> {
    const SLACK: f64 = 1e-12;
    for w in cdf.windows(2) {
        if w[1] < w[0] - SLACK {
            return Err(JdfError::numerical(format!(
                "cumulative distribution decreases ({} -> {})",
                w[0], w[1]
            )));
        }
    }
    Ok(())
}

/// Inverts a non-decreasing CDF at `u` by piecewise-linear interpolation
/// of the (cdf, xs) pairs, extrapolating linearly at the domain edges.
/// Flat segments (repeated CDF values) collapse to their right knot.
pub fn invert_cdf(cdf: &[f64], xs: &[f64], u: f64) -> f64 {
    debug_assert_eq!(cdf.len(), xs.len());
    let n = cdf.len();
    if n == 1 {
        return xs[0];
    }

    // Below the first knot: extrapolate along the first rising segment.
    if u < cdf[0] {
        if let Some(hi) = (1..n).find(|&i| cdf[i] > cdf[0]) {
            let slope = (xs[hi] - xs[0]) / (cdf[hi] - cdf[0]);
            return xs[0] + slope * (u - cdf[0]);
        }
        return xs[0];
    }
    // Above the last knot: extrapolate along the last rising segment.
    if u >= cdf[n - 1] {
        if let Some(lo) = (0..n - 1).rev().find(|&i| cdf[i] < cdf[n - 1]) {
            let slope = (xs[n - 1] - xs[lo]) / (cdf[n - 1] - cdf[lo]);
            return xs[n - 1] + slope * (u - cdf[n - 1]);
        }
        return xs[n - 1];
    }

    let hi = cdf.partition_point(|&v| v < u).max(1);
    let lo = hi - 1;
    let width = cdf[hi] - cdf[lo];
    if width <= 0.0 {
        return xs[hi];
    }
    let t = (u - cdf[lo]) / width;
    xs[lo] + t * (xs[hi] - xs[lo])
}

/// Cumulative sum of a probability mass.
pub fn cumsum(pdf: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    pdf.iter()
        .map(|&p| {
            acc += p;
            acc
        })
        .collect()
}
