//! Fixed-width Gaussian smoothing for histogram artifacts.
//!
//! Kernel width σ = 1.0 bins, truncated at 4σ, with half-sample-symmetric
//! ("reflect") boundary handling, applied separably along each axis.

use ndarray::{Array3, Axis};

/// Default smoothing width in bins.
pub const DEFAULT_SIGMA: f64 = 1.0;

const TRUNCATE: f64 = 4.0;

/// Normalized Gaussian kernel sampled at integer offsets \[-r, r\] with
/// r = ⌊truncate·σ + 0.5⌋.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let mut kernel: Vec<f64> = (-(radius as isize)..=radius as isize)
        .map(|i| (-0.5 * (i as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Half-sample-symmetric boundary index: (d c b a | a b c d | d c b a).
fn reflect(mut i: isize, n: isize) -> usize {
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - 1 - i;
        } else {
            return i as usize;
        }
    }
}

/// Smooths a 1D histogram in place-order, returning a new vector.
pub fn smooth_1d(data: &[f64], sigma: f64) -> Vec<f64> {
    let n = data.len() as isize;
    if n == 0 {
        return Vec::new();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, &w)| w * data[reflect(i + k as isize - radius, n)])
                .sum()
        })
        .collect()
}

/// Smooths a 3D histogram separably along all three axes.
pub fn smooth_3d(mut data: Array3<f64>, sigma: f64) -> Array3<f64> {
    for axis in 0..3 {
        for mut lane in data.lanes_mut(Axis(axis)) {
            let buf = lane.to_vec();
            let smoothed = smooth_1d(&buf, sigma);
            for (dst, v) in lane.iter_mut().zip(smoothed) {
                *dst = v;
            }
        }
    }
    data
}
