//! Longitudinal current profile: smoothed 1D histogram + shape-preserving
//! monotone cubic (PCHIP) interpolant over bin centers.
//!
//! The histogram spans the stretched domain `[min − S·range, max + S·range]`
//! so slices can be placed past the observed extremes. The count of bins
//! with strictly positive smoothed height scales the per-slice electron
//! count downstream.

use log::debug;

use crate::errors::{JdfError, Result};
use crate::smooth::{self, DEFAULT_SIGMA};
use crate::types::AxisExtent;

/// Continuously queryable relative electron count per unit length.
#[derive(Debug, Clone)]
pub struct LongitudinalProfile {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
    /// Bins with strictly positive smoothed height.
    pub nonzero_bins: usize,
    domain: AxisExtent,
}

impl LongitudinalProfile {
    /// Builds the profile from longitudinal positions and weights.
    pub fn build(z: &[f64], weights: &[f64], bins: usize, stretch_factor: f64) -> Result<Self> {
        if bins < 2 {
            return Err(JdfError::config("longitudinal profile needs >= 2 bins"));
        }
        let extent = AxisExtent::from_values(z)?;
        if !(extent.span() > 0.0) {
            return Err(JdfError::config(
                "cannot build a current profile from a single longitudinal plane",
            ));
        }
        let domain = extent.stretched(stretch_factor);

        let mut hist = vec![0.0; bins];
        let width = domain.span() / bins as f64;
        for (&zi, &wi) in z.iter().zip(weights) {
            if zi < domain.min || zi > domain.max {
                continue;
            }
            let idx = (((zi - domain.min) / width) as usize).min(bins - 1);
            hist[idx] += wi;
        }
        let smoothed = smooth::smooth_1d(&hist, DEFAULT_SIGMA);
        let nonzero_bins = smoothed.iter().filter(|&&h| h > 0.0).count();
        debug!(
            "current profile: {nonzero_bins} of {bins} bins populated over \
             [{:.4e}, {:.4e}]",
            domain.min, domain.max
        );

        let xs: Vec<f64> = (0..bins)
            .map(|i| domain.min + width * (i as f64 + 0.5))
            .collect();
        let slopes = pchip_slopes(&xs, &smoothed);
        Ok(LongitudinalProfile {
            xs,
            ys: smoothed,
            slopes,
            nonzero_bins,
            domain,
        })
    }

    /// Profile height at `z`. Finite and non-negative everywhere;
    /// queries past the outermost bin centers extend the end segments.
    pub fn query(&self, z: f64) -> f64 {
        self.eval_hermite(z).max(0.0)
    }

    /// Stretched domain the histogram was accumulated over.
    pub fn domain(&self) -> AxisExtent {
        self.domain
    }

    fn eval_hermite(&self, z: f64) -> f64 {
        let n = self.xs.len();
        // Clamp to the end cubic segments for edge extrapolation.
        let seg = if z <= self.xs[0] {
            0
        } else if z >= self.xs[n - 1] {
            n - 2
        } else {
            self.xs.partition_point(|&x| x < z).max(1) - 1
        };
        let h = self.xs[seg + 1] - self.xs[seg];
        let t = (z - self.xs[seg]) / h;
        let (y0, y1) = (self.ys[seg], self.ys[seg + 1]);
        let (d0, d1) = (self.slopes[seg], self.slopes[seg + 1]);
        let t2 = t * t;
        let t3 = t2 * t;
        y0 * (2.0 * t3 - 3.0 * t2 + 1.0)
            + d0 * h * (t3 - 2.0 * t2 + t)
            + y1 * (-2.0 * t3 + 3.0 * t2)
            + d1 * h * (t3 - t2)
    }
}

/// Fritsch–Carlson monotone slopes (weighted harmonic mean of adjacent
/// secants, zero where the data turns), with one-sided three-point
/// endpoint slopes clamped for shape preservation.
fn pchip_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    debug_assert!(n >= 2);
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let m: Vec<f64> = ys
        .windows(2)
        .zip(&h)
        .map(|(w, &hi)| (w[1] - w[0]) / hi)
        .collect();

    let mut d = vec![0.0; n];
    for i in 1..n - 1 {
        if m[i - 1] * m[i] <= 0.0 {
            d[i] = 0.0;
        } else {
            let w1 = 2.0 * h[i] + h[i - 1];
            let w2 = h[i] + 2.0 * h[i - 1];
            d[i] = (w1 + w2) / (w1 / m[i - 1] + w2 / m[i]);
        }
    }
    d[0] = edge_slope(h[0], h.get(1).copied().unwrap_or(h[0]), m[0], m.get(1).copied().unwrap_or(m[0]));
    d[n - 1] = edge_slope(
        h[n - 2],
        if n >= 3 { h[n - 3] } else { h[n - 2] },
        m[n - 2],
        if n >= 3 { m[n - 3] } else { m[n - 2] },
    );
    d
}

/// One-sided three-point endpoint slope with monotonicity clamps.
fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let mut d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if d * m0 <= 0.0 {
        d = 0.0;
    } else if m0 * m1 < 0.0 && d.abs() > 3.0 * m0.abs() {
        d = 3.0 * m0;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp_sample() -> (Vec<f64>, Vec<f64>) {
        // Linearly increasing line density along z in [0, 1].
        let mut z = Vec::new();
        let mut w = Vec::new();
        for i in 0..2000 {
            let t = (i as f64 + 0.5) / 2000.0;
            z.push(t.sqrt()); // quantile transform of pdf ∝ z
            w.push(1.0);
        }
        (z, w)
    }

    #[test]
    fn profile_is_non_negative_across_domain() {
        let (z, w) = ramp_sample();
        let profile = LongitudinalProfile::build(&z, &w, 20, 0.1).unwrap();
        let d = profile.domain();
        for i in 0..=200 {
            let zq = d.min + d.span() * i as f64 / 200.0;
            assert!(profile.query(zq) >= 0.0);
        }
    }

    #[test]
    fn monotone_data_gives_monotone_interpolant() {
        // Strictly increasing knot heights must not oscillate.
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = (0..10).map(|i| (i * i) as f64).collect();
        let slopes = pchip_slopes(&xs, &ys);
        let profile = LongitudinalProfile {
            xs: xs.clone(),
            ys,
            slopes,
            nonzero_bins: 9,
            domain: AxisExtent { min: 0.0, max: 9.0 },
        };
        let mut prev = profile.query(0.0);
        for i in 1..=300 {
            let zq = 9.0 * i as f64 / 300.0;
            let v = profile.query(zq);
            assert!(v >= prev - 1e-9, "oscillation at z = {zq}");
            prev = v;
        }
    }

    #[test]
    fn interpolant_passes_through_knots() {
        let (z, w) = ramp_sample();
        let profile = LongitudinalProfile::build(&z, &w, 16, 0.0).unwrap();
        for (x, y) in profile.xs.iter().zip(&profile.ys) {
            assert_relative_eq!(profile.query(*x), y.max(0.0), epsilon = 1e-9);
        }
    }

    #[test]
    fn nonzero_bins_counts_populated_bins() {
        let (z, w) = ramp_sample();
        let profile = LongitudinalProfile::build(&z, &w, 20, 0.0).unwrap();
        // Every bin of a full-range sample is populated after smoothing.
        assert_eq!(profile.nonzero_bins, 20);

        // All-zero weights populate nothing.
        let zeros = vec![0.0; z.len()];
        let empty = LongitudinalProfile::build(&z, &zeros, 20, 0.0).unwrap();
        assert_eq!(empty.nonzero_bins, 0);
        assert_eq!(empty.query(0.5), 0.0);
    }

    #[test]
    fn single_plane_is_fatal() {
        let z = vec![1.0; 50];
        let w = vec![1.0; 50];
        assert!(LongitudinalProfile::build(&z, &w, 20, 0.0).is_err());
    }

    #[test]
    fn stretch_widens_domain() {
        let (z, w) = ramp_sample();
        let tight = LongitudinalProfile::build(&z, &w, 20, 0.0).unwrap();
        let wide = LongitudinalProfile::build(&z, &w, 20, 0.5).unwrap();
        assert!(wide.domain().span() > tight.domain().span());
    }
}
