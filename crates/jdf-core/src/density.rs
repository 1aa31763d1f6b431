//! 3D density estimation from the weighted point cloud.
//!
//! The cloud is histogrammed on a regular grid, smoothed with a
//! fixed-width Gaussian kernel, and the strictly-positive cells become a
//! scattered point set queried by nearest neighbor. Each axis is rescaled
//! to \[0, 1\] before distance comparisons so no physical axis dominates.
//! Nearest-neighbor lookup trades some smoothness for speed over exact
//! linear interpolation; queries outside the sampled hull fall back to the
//! nearest known cell, never extrapolating.

use log::{debug, info};
use ndarray::Array3;

use crate::errors::{JdfError, Result};
use crate::kdtree::KdTree;
use crate::smooth::{self, DEFAULT_SIGMA};
use crate::types::{AxisExtent, ParticleCloud};

/// Weighted 3D histogram over the given extents. The rightmost bin is
/// closed so boundary samples are not dropped.
pub fn histogram3d(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    weights: &[f64],
    bins: (usize, usize, usize),
    extents: (AxisExtent, AxisExtent, AxisExtent),
) -> Result<Array3<f64>> {
    let (bx, by, bz) = bins;
    let (ex, ey, ez) = extents;
    if !(ex.span() > 0.0 && ey.span() > 0.0 && ez.span() > 0.0) {
        return Err(JdfError::config(
            "degenerate spatial domain: zero extent along an axis",
        ));
    }
    let mut hist = Array3::<f64>::zeros((bx, by, bz));
    let bin_of = |v: f64, e: AxisExtent, b: usize| -> Option<usize> {
        if v < e.min || v > e.max {
            return None;
        }
        Some(((e.rescale(v) * b as f64) as usize).min(b - 1))
    };
    for i in 0..x.len() {
        let (Some(ix), Some(iy), Some(iz)) =
            (bin_of(x[i], ex, bx), bin_of(y[i], ey, by), bin_of(z[i], ez, bz))
        else {
            continue;
        };
        hist[[ix, iy, iz]] += weights[i];
    }
    Ok(hist)
}

/// Continuous non-negative density query over the beam volume.
#[derive(Debug)]
pub struct DensityField {
    tree: KdTree,
    values: Vec<f64>,
    extent_x: AxisExtent,
    extent_y: AxisExtent,
    extent_z: AxisExtent,
}

impl DensityField {
    /// Histograms the cloud, smooths it, and indexes the positive cells.
    pub fn build(cloud: &ParticleCloud, bins: (usize, usize, usize)) -> Result<Self> {
        let extent_x = cloud.extent_x()?;
        let extent_y = cloud.extent_y()?;
        let extent_z = cloud.extent_z()?;

        let hist = histogram3d(
            &cloud.x,
            &cloud.y,
            &cloud.z,
            &cloud.weight,
            bins,
            (extent_x, extent_y, extent_z),
        )?;
        debug!("density histogram done, total mass {:.6e}", hist.sum());
        let smoothed = smooth::smooth_3d(hist, DEFAULT_SIGMA);

        // Cell (i, j, k) maps onto the equispaced grid node spanning the
        // full extent; only cells with positive evidence enter the field.
        let (bx, by, bz) = smoothed.dim();
        let mut points = Vec::new();
        let mut values = Vec::new();
        for ((i, j, k), &v) in smoothed.indexed_iter() {
            if v > 0.0 {
                let gx = grid_node(extent_x, i, bx);
                let gy = grid_node(extent_y, j, by);
                let gz = grid_node(extent_z, k, bz);
                points.push([
                    extent_x.rescale(gx),
                    extent_y.rescale(gy),
                    extent_z.rescale(gz),
                ]);
                values.push(v);
            }
        }
        if points.is_empty() {
            return Err(JdfError::config(
                "density field is empty: no cell accumulated positive weight",
            ));
        }
        info!(
            "density field: {} of {} cells carry positive density",
            points.len(),
            bx * by * bz
        );
        Ok(DensityField {
            tree: KdTree::build(&points),
            values,
            extent_x,
            extent_y,
            extent_z,
        })
    }

    /// Density at a 3D position: value of the nearest positive cell in
    /// rescaled coordinates. Always finite and non-negative.
    pub fn query(&self, x: f64, y: f64, z: f64) -> f64 {
        let q = [
            self.extent_x.rescale(x),
            self.extent_y.rescale(y),
            self.extent_z.rescale(z),
        ];
        // Build guarantees at least one indexed cell.
        match self.tree.nearest(&q) {
            Some((idx, _)) => self.values[idx],
            None => 0.0,
        }
    }

    pub fn extent_x(&self) -> AxisExtent {
        self.extent_x
    }

    pub fn extent_y(&self) -> AxisExtent {
        self.extent_y
    }
}

/// Node `i` of `n` equispaced grid nodes spanning the extent inclusively.
fn grid_node(extent: AxisExtent, i: usize, n: usize) -> f64 {
    if n < 2 {
        return extent.min;
    }
    extent.min + extent.span() * i as f64 / (n - 1) as f64
}
