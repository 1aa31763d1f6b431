//! Deterministic low-discrepancy Halton sequences.
//!
//! Column `k` of the sequence is the radical-inverse (digit-reversal)
//! sequence in the k-th smallest prime base. Output depends only on the
//! requested shape; there is no seed and repeated calls are bit-identical.
//!
//! Two independently named streams share the mechanism so they cannot be
//! accidentally correlated by later changes:
//! - [`transverse_pairs`] — the per-slice-particle (u_x, u_y) coordinates
//!   driving CDF inversion (bases 2 and 3),
//! - [`jitter_stream`] — the sub-slice longitudinal displacement stream
//!   (0.5 − base-3 radical inverse), which avoids banding from placing
//!   every particle exactly on its slice plane.

use ndarray::Array2;

use crate::errors::{JdfError, Result};

/// The first 38 primes; one Halton base per supported dimension.
const PRIMES: [u64; 38] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163,
];

/// Maximum supported dimensionality.
pub const MAX_DIMS: usize = PRIMES.len();

/// Radical inverse of `n` in the given base: reverses the digits of `n`
/// around the radix point. Result is in \[0, 1).
pub fn radical_inverse(base: u64, mut n: u64) -> f64 {
    let inv_base = 1.0 / base as f64;
    let mut frac = inv_base;
    let mut value = 0.0;
    while n > 0 {
        value += (n % base) as f64 * frac;
        n /= base;
        frac *= inv_base;
    }
    value
}

/// The first `n` Halton points in `dims` dimensions as an `n × dims`
/// matrix of values in \[0, 1). Index 0 corresponds to the sequence
/// element for integer 1 (zero itself maps to the origin in every base and
/// is skipped).
pub fn matrix(dims: usize, n: usize) -> Result<Array2<f64>> {
    if dims == 0 || dims > MAX_DIMS {
        return Err(JdfError::config(format!(
            "Halton dimensionality {dims} unsupported (1..={MAX_DIMS})"
        )));
    }
    let mut out = Array2::zeros((n, dims));
    for (k, &base) in PRIMES.iter().take(dims).enumerate() {
        for j in 0..n {
            out[[j, k]] = radical_inverse(base, j as u64 + 1);
        }
    }
    Ok(out)
}

/// Quasi-random (u_x, u_y) draws for `n` slice particles.
pub fn transverse_pairs(n: usize) -> Vec<[f64; 2]> {
    (0..n)
        .map(|j| {
            let d = j as u64 + 1;
            [radical_inverse(2, d), radical_inverse(3, d)]
        })
        .collect()
}

/// De-correlated jitter stream in (-0.5, 0.5\]: each value displaces one
/// new particle within its slice along z, in units of the slice step.
pub fn jitter_stream(n: usize) -> Vec<f64> {
    (0..n)
        .map(|j| 0.5 - radical_inverse(3, j as u64 + 1))
        .collect()
}
