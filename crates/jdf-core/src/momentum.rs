//! Momentum interpolation from the original cloud onto new positions.
//!
//! Each momentum component is interpolated independently by a local
//! linear least-squares fit over the k nearest original particles, with
//! every axis rescaled to the cloud's extent so distances are
//! commensurate. The three components share the same read-only inputs and
//! write disjoint output columns, so they run concurrently and join at
//! the end. Queries outside the sampled hull are explicitly undefined
//! (`None`) — never a numeric guess — and are filtered by the charge
//! normalizer. The hull test is two-staged: the rescaled bounding box
//! first, then a local guard rejecting queries whose nearest source sits
//! near the edge of its own k-NN neighborhood (which happens exactly when
//! every neighbor lies off to one side, e.g. in a concave notch of the
//! beam).

use log::info;
use nalgebra::{DMatrix, DVector};

use crate::errors::Result;
use crate::kdtree::KdTree;
use crate::types::{AxisExtent, ParticleCloud};

/// Neighborhood size for the local linear fit.
const FIT_NEIGHBORS: usize = 12;

/// Slack on the rescaled \[0, 1\] domain test; jittered positions sitting
/// numerically on the hull still count as inside.
const DOMAIN_EPS: f64 = 1e-9;

/// Fraction of the k-NN neighborhood radius the nearest source may
/// occupy before a query counts as outside the sampled hull. Interior
/// queries in a well-sampled cloud sit well below half the radius.
const HULL_GUARD: f64 = 0.75;

/// Scattered-data interpolator over the original beam's momentum table.
pub struct MomentumMapper {
    tree: KdTree,
    /// Rescaled source positions, indexed like the momentum columns.
    points: Vec<[f64; 3]>,
    px: Vec<f64>,
    py: Vec<f64>,
    pz: Vec<f64>,
    extent_x: AxisExtent,
    extent_y: AxisExtent,
    extent_z: AxisExtent,
}

/// Momentum columns for the new particle set; `None` marks positions the
/// interpolation could not define.
pub struct MappedMomentum {
    pub px: Vec<Option<f64>>,
    pub py: Vec<Option<f64>>,
    pub pz: Vec<Option<f64>>,
}

impl MomentumMapper {
    pub fn new(cloud: &ParticleCloud) -> Result<Self> {
        let extent_x = cloud.extent_x()?;
        let extent_y = cloud.extent_y()?;
        let extent_z = cloud.extent_z()?;
        let points: Vec<[f64; 3]> = (0..cloud.len())
            .map(|i| {
                [
                    extent_x.rescale(cloud.x[i]),
                    extent_y.rescale(cloud.y[i]),
                    extent_z.rescale(cloud.z[i]),
                ]
            })
            .collect();
        Ok(MomentumMapper {
            tree: KdTree::build(&points),
            points,
            px: cloud.px.clone(),
            py: cloud.py.clone(),
            pz: cloud.pz.clone(),
            extent_x,
            extent_y,
            extent_z,
        })
    }

    /// Interpolates all three momentum components onto the new positions,
    /// computing the components concurrently.
    pub fn map(&self, positions: &[[f64; 3]]) -> MappedMomentum {
        info!(
            "interpolating momentum for {} new particles over {} sources",
            positions.len(),
            self.tree.len()
        );
        let queries: Vec<Option<[f64; 3]>> = positions
            .iter()
            .map(|&[x, y, z]| {
                let q = [
                    self.extent_x.rescale(x),
                    self.extent_y.rescale(y),
                    self.extent_z.rescale(z),
                ];
                q.iter()
                    .all(|&c| (-DOMAIN_EPS..=1.0 + DOMAIN_EPS).contains(&c))
                    .then_some(q)
            })
            .collect();

        let (px, (py, pz)) = rayon::join(
            || self.interpolate_component(&self.px, &queries),
            || {
                rayon::join(
                    || self.interpolate_component(&self.py, &queries),
                    || self.interpolate_component(&self.pz, &queries),
                )
            },
        );
        MappedMomentum { px, py, pz }
    }

    fn interpolate_component(
        &self,
        values: &[f64],
        queries: &[Option<[f64; 3]>],
    ) -> Vec<Option<f64>> {
        queries
            .iter()
            .map(|q| q.and_then(|q| self.fit_at(values, &q)))
            .collect()
    }

    /// Local linear model `p ≈ c0 + c·Δr` fitted over the k nearest
    /// sources in rescaled coordinates; the intercept is the prediction
    /// at the query. Queries whose nearest source approaches the
    /// neighborhood radius lie outside the sampled hull and are `None`.
    /// Degenerate neighborhoods (coplanar or too few points) fall back
    /// to the nearest source value.
    fn fit_at(&self, values: &[f64], query: &[f64; 3]) -> Option<f64> {
        let neighbors = self.tree.k_nearest(query, FIT_NEIGHBORS);
        let (nearest_idx, nearest_d_sq) = *neighbors.first()?;
        let radius_sq = neighbors[neighbors.len() - 1].1;
        if nearest_d_sq > HULL_GUARD * HULL_GUARD * radius_sq {
            return None;
        }
        if neighbors.len() < 4 {
            return Some(values[nearest_idx]);
        }

        let k = neighbors.len();
        let mut a = DMatrix::<f64>::zeros(k, 4);
        let mut b = DVector::<f64>::zeros(k);
        for (row, &(idx, _)) in neighbors.iter().enumerate() {
            let p = self.points[idx];
            a[(row, 0)] = 1.0;
            a[(row, 1)] = p[0] - query[0];
            a[(row, 2)] = p[1] - query[1];
            a[(row, 3)] = p[2] - query[2];
            b[row] = values[idx];
        }
        let svd = a.svd(true, true);
        match svd.solve(&b, 1e-10) {
            Ok(coeffs) if coeffs[0].is_finite() => Some(coeffs[0]),
            _ => Some(values[nearest_idx]),
        }
    }
}
