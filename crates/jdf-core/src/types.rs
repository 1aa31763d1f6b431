//! Core data types: particles, the weighted point cloud, axis extents.

use crate::errors::{JdfError, Result};

/// A single macroparticle: position \[m\], momentum \[kg·m/s\], and the
/// number of real electrons it represents. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub px: f64,
    pub y: f64,
    pub py: f64,
    pub z: f64,
    pub pz: f64,
    pub weight: f64,
}

/// Closed interval \[min, max\] along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisExtent {
    pub min: f64,
    pub max: f64,
}

impl AxisExtent {
    /// Extent of a non-empty finite sample.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values {
            if !v.is_finite() {
                return Err(JdfError::numerical("non-finite coordinate in input"));
            }
            min = min.min(v);
            max = max.max(v);
        }
        if values.is_empty() {
            return Err(JdfError::config("cannot take extent of empty sample"));
        }
        Ok(AxisExtent { min, max })
    }

    /// Width of the interval.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Widens both ends by `factor * span`. Used to allow slice placement
    /// past the observed longitudinal extremes.
    pub fn stretched(&self, factor: f64) -> AxisExtent {
        let pad = factor * self.span();
        AxisExtent {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Whether `v` lies inside the interval (inclusive).
    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }

    /// Maps `v` onto \[0, 1\] over this extent. Degenerate extents map to 0.
    pub fn rescale(&self, v: f64) -> f64 {
        let span = self.span();
        if span > 0.0 {
            (v - self.min) / span
        } else {
            0.0
        }
    }
}

/// The input beam as immutable columnar evidence: positions, SI momenta,
/// and statistical weights. Never mutated by the engine.
#[derive(Debug, Clone)]
pub struct ParticleCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub px: Vec<f64>,
    pub py: Vec<f64>,
    pub pz: Vec<f64>,
    pub weight: Vec<f64>,
}

impl ParticleCloud {
    /// Builds a cloud from equal-length columns.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        x: Vec<f64>,
        px: Vec<f64>,
        y: Vec<f64>,
        py: Vec<f64>,
        z: Vec<f64>,
        pz: Vec<f64>,
        weight: Vec<f64>,
    ) -> Result<Self> {
        let n = x.len();
        if [&px, &y, &py, &z, &pz, &weight].iter().any(|c| c.len() != n) {
            return Err(JdfError::config("particle table columns differ in length"));
        }
        if n == 0 {
            return Err(JdfError::config("particle table is empty"));
        }
        Ok(ParticleCloud {
            x,
            y,
            z,
            px,
            py,
            pz,
            weight,
        })
    }

    pub fn from_particles(particles: &[Particle]) -> Result<Self> {
        ParticleCloud::new(
            particles.iter().map(|p| p.x).collect(),
            particles.iter().map(|p| p.px).collect(),
            particles.iter().map(|p| p.y).collect(),
            particles.iter().map(|p| p.py).collect(),
            particles.iter().map(|p| p.z).collect(),
            particles.iter().map(|p| p.pz).collect(),
            particles.iter().map(|p| p.weight).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Total number of real electrons represented.
    pub fn total_weight(&self) -> f64 {
        self.weight.iter().sum()
    }

    pub fn extent_x(&self) -> Result<AxisExtent> {
        AxisExtent::from_values(&self.x)
    }

    pub fn extent_y(&self) -> Result<AxisExtent> {
        AxisExtent::from_values(&self.y)
    }

    pub fn extent_z(&self) -> Result<AxisExtent> {
        AxisExtent::from_values(&self.z)
    }
}
