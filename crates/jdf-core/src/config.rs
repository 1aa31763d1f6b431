//! Resampling configuration with documented defaults.
//!
//! One serde struct validated once at startup. Every field is optional in
//! the TOML parameter file; absent fields take the defaults below.

use serde::{Deserialize, Serialize};

use crate::errors::{JdfError, Result};

/// User parameters for one resampling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JdfConfig {
    /// Undulator wavenumber k_u \[1/m\]; sets the resonant wavelength scale.
    pub undulator_wavenumber: f64,

    /// Dimensionless undulator parameter a_u (plane-pole configuration).
    pub undulator_parameter: f64,

    /// Number of longitudinal slices per resonant wavelength.
    pub slices_per_wavelength: f64,

    /// New particles generated per active slice.
    pub slice_particle_count: usize,

    /// Density sampling bins along x.
    pub bins_x: usize,

    /// Density sampling bins along y.
    pub bins_y: usize,

    /// Current/density sampling bins along z.
    pub bins_z: usize,

    /// Symmetric stretch of the longitudinal domain beyond the observed
    /// extremes, as a fraction of the beam length.
    pub stretch_factor: f64,

    /// Oversampling factor for the fine marginal grids used in CDF
    /// inversion (1.0 keeps the histogram resolution).
    pub oversampling: f64,

    /// Seed for the noise stages (weight Poisson draw, longitudinal shot
    /// noise). The Halton streams are seed-free. `None` draws a seed from
    /// OS entropy; the seed actually used is recorded in the run report.
    pub rng_seed: Option<u64>,
}

impl Default for JdfConfig {
    fn default() -> Self {
        JdfConfig {
            undulator_wavenumber: 228.4727,
            undulator_parameter: 1.012_180_9,
            slices_per_wavelength: 10.0,
            slice_particle_count: 800,
            bins_x: 40,
            bins_y: 40,
            bins_z: 40,
            stretch_factor: 0.0,
            oversampling: 1.0,
            rng_seed: None,
        }
    }
}

impl JdfConfig {
    /// Validates all fields; called once before any work starts.
    pub fn validate(&self) -> Result<()> {
        if !(self.undulator_wavenumber > 0.0) {
            return Err(JdfError::config("undulator_wavenumber must be > 0"));
        }
        if !(self.undulator_parameter > 0.0) {
            return Err(JdfError::config("undulator_parameter must be > 0"));
        }
        if !(self.slices_per_wavelength > 0.0) {
            return Err(JdfError::config("slices_per_wavelength must be > 0"));
        }
        if self.slice_particle_count == 0 {
            return Err(JdfError::config("slice_particle_count must be >= 1"));
        }
        if self.bins_x < 2 || self.bins_y < 2 || self.bins_z < 2 {
            return Err(JdfError::config("density sampling needs >= 2 bins per axis"));
        }
        if !(self.stretch_factor >= 0.0) {
            return Err(JdfError::config("stretch_factor must be >= 0"));
        }
        if !(self.oversampling >= 1.0) {
            return Err(JdfError::config("oversampling must be >= 1"));
        }
        Ok(())
    }
}
