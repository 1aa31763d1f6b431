//! Per-slice joint-distribution sampling ("JDF core").
//!
//! For one longitudinal slice the sampler reconstructs the 2D transverse
//! density and draws new particle positions from it: the X marginal is
//! inverted at a quasi-random coordinate, the conditional Y distribution
//! at the drawn x is approximated by blending the two nearest histogram
//! rows, and inverted at the second quasi-random coordinate. Each draw is
//! independent; a slice contributes exactly `slice_particle_count` seeds.

use log::{debug, warn};
use ndarray::Array2;

use crate::density::DensityField;
use crate::errors::Result;
use crate::interp::{check_non_decreasing, cumsum, invert_cdf, lerp_grid, linspace};

/// A newly sampled particle position with its estimated electron weight.
/// Momentum is attached later by the momentum mapper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceSeed {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub weight: f64,
}

/// One slice's work order: plane position and per-particle electron count.
#[derive(Debug, Clone, Copy)]
pub struct SlicePlan {
    pub index: usize,
    pub z: f64,
    pub electrons_per_particle: f64,
}

/// Reconstructs per-slice joint distributions and draws seeds from them.
/// Read-only after construction; safe to share across worker threads.
pub struct SliceSampler<'a> {
    density: &'a DensityField,
    grid_x: Vec<f64>,
    grid_y: Vec<f64>,
    fine_x: Vec<f64>,
    fine_y: Vec<f64>,
    quasi_pairs: &'a [[f64; 2]],
    jitter: &'a [f64],
    slice_step: f64,
}

impl<'a> SliceSampler<'a> {
    pub fn new(
        density: &'a DensityField,
        bins: (usize, usize),
        oversampling: f64,
        quasi_pairs: &'a [[f64; 2]],
        jitter: &'a [f64],
        slice_step: f64,
    ) -> Self {
        let ex = density.extent_x();
        let ey = density.extent_y();
        let grid_x = linspace(ex.min, ex.max, bins.0);
        let grid_y = linspace(ey.min, ey.max, bins.1);
        let fine_nx = (oversampling * bins.0 as f64).round() as usize;
        let fine_ny = (oversampling * bins.1 as f64).round() as usize;
        let fine_x = linspace(ex.min, ex.max, fine_nx.max(2));
        let fine_y = linspace(ey.min, ey.max, fine_ny.max(2));
        SliceSampler {
            density,
            grid_x,
            grid_y,
            fine_x,
            fine_y,
            quasi_pairs,
            jitter,
            slice_step,
        }
    }

    /// Draws all seeds for one slice. The per-draw state is only the
    /// slice's own sampled distribution; draws never interact.
    pub fn sample(&self, plan: &SlicePlan) -> Result<Vec<SliceSeed>> {
        let dist = self.slice_distribution(plan.z);
        let mass: f64 = dist.sum();
        if !(mass > 0.0) {
            warn!(
                "slice {} at z = {:.4e} carries no transverse density; skipping",
                plan.index, plan.z
            );
            return Ok(Vec::new());
        }

        // X column marginal on the fine grid, clipped against
        // interpolation undershoot, renormalized to a probability mass.
        let column: Vec<f64> = (0..self.grid_x.len())
            .map(|ix| (0..self.grid_y.len()).map(|iy| dist[[ix, iy]]).sum())
            .collect();
        let Some(pdf_x) = self.fine_pdf(&self.grid_x, &column, &self.fine_x) else {
            warn!(
                "slice {}: X marginal lost all mass after clipping; skipping",
                plan.index
            );
            return Ok(Vec::new());
        };
        let cdf_x = cumsum(&pdf_x);
        check_non_decreasing(&cdf_x)?;

        let n = self.quasi_pairs.len();
        let mut seeds = Vec::with_capacity(n);
        for j in 0..n {
            let [ux, uy] = self.quasi_pairs[j];
            let x0 = invert_cdf(&cdf_x, &self.fine_x, ux);
            let y0 = self.draw_conditional_y(&dist, x0, uy)?;
            seeds.push(SliceSeed {
                x: x0,
                y: y0,
                z: plan.z + self.slice_step * self.jitter[j],
                weight: plan.electrons_per_particle,
            });
        }
        debug!("slice {}: drew {} seeds", plan.index, seeds.len());
        Ok(seeds)
    }

    /// Samples the 3D field on the (X, Y) grid at the slice plane.
    fn slice_distribution(&self, z: f64) -> Array2<f64> {
        let mut dist = Array2::<f64>::zeros((self.grid_x.len(), self.grid_y.len()));
        for (ix, &gx) in self.grid_x.iter().enumerate() {
            for (iy, &gy) in self.grid_y.iter().enumerate() {
                dist[[ix, iy]] = self.density.query(gx, gy, z);
            }
        }
        dist
    }

    /// Conditional Y draw at `x0`: blend the two nearest histogram rows,
    /// refine, clip, renormalize, and invert. A conditional with zero
    /// mass yields an undefined (NaN) coordinate that the normalizer
    /// discards downstream.
    fn draw_conditional_y(&self, dist: &Array2<f64>, x0: f64, uy: f64) -> Result<f64> {
        let (i1, i2, tw1, tw2) = blend_weights(&self.grid_x, x0);
        let row: Vec<f64> = (0..self.grid_y.len())
            .map(|iy| tw1 * dist[[i1, iy]] + tw2 * dist[[i2, iy]])
            .collect();
        let Some(pdf_y) = self.fine_pdf(&self.grid_y, &row, &self.fine_y) else {
            return Ok(f64::NAN);
        };
        let cdf_y = cumsum(&pdf_y);
        check_non_decreasing(&cdf_y)?;
        Ok(invert_cdf(&cdf_y, &self.fine_y, uy))
    }

    /// Interpolates a coarse marginal onto a fine grid, clips negative
    /// overshoot to zero, and normalizes. `None` when no mass survives.
    fn fine_pdf(&self, coarse: &[f64], values: &[f64], fine: &[f64]) -> Option<Vec<f64>> {
        let mut pdf: Vec<f64> = fine
            .iter()
            .map(|&fx| lerp_grid(coarse, values, fx).max(0.0))
            .collect();
        let sum: f64 = pdf.iter().sum();
        if !(sum > 0.0) {
            return None;
        }
        for p in &mut pdf {
            *p /= sum;
        }
        Some(pdf)
    }
}

/// Two nearest grid nodes to `x0` and their linear blend weights
/// (`tw1 + tw2 = 1`). Coinciding nodes degrade to single-node selection.
fn blend_weights(grid: &[f64], x0: f64) -> (usize, usize, f64, f64) {
    let n = grid.len();
    let hi = grid.partition_point(|&g| g < x0);
    let (i1, i2) = if hi == 0 {
        (0, 1.min(n - 1))
    } else if hi >= n {
        (n.saturating_sub(2), n - 1)
    } else {
        (hi - 1, hi)
    };
    let (x_min, x_max) = (grid[i1], grid[i2]);
    let span = x_max - x_min;
    if span.abs() < f64::EPSILON * x_max.abs().max(1.0) {
        return (i1, i2, 1.0, 0.0);
    }
    let tw1 = 1.0 - (x0 - x_min) / span;
    let tw2 = 1.0 - (x_max - x0) / span;
    (i1, i2, tw1, tw2)
}
