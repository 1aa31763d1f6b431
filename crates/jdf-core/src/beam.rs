//! Derived beam frame: Lorentz factor, resonant wavelength, slicing.
//!
//! The longitudinal domain is partitioned into equal-width slices whose
//! count follows from the FEL resonance condition for a plane-pole
//! undulator: λ_r = λ_u / (2γ₀²) · (1 + a_u²/2), with the slice density
//! set by the slices-per-wavelength multiplier.

use std::f64::consts::PI;

use log::debug;

use crate::config::JdfConfig;
use crate::constants::MOMENTUM_SCALE;
use crate::errors::{JdfError, Result};
use crate::types::{AxisExtent, ParticleCloud};

/// Slicing geometry and the wavelength scale it derives from.
#[derive(Debug, Clone)]
pub struct BeamFrame {
    /// Mean Lorentz factor of the input beam.
    pub gamma0: f64,
    /// Undulator period 2π/k_u \[m\].
    pub undulator_wavelength: f64,
    /// Resonant wavelength \[m\].
    pub resonant_wavelength: f64,
    /// Number of equal-width longitudinal slices.
    pub n_slices: usize,
    /// Observed longitudinal extent of the beam.
    pub z_extent: AxisExtent,
    /// Stretched extent used for the current histogram and slice count.
    pub stretched_extent: AxisExtent,
    /// Width of one slice \[m\].
    pub slice_step: f64,
}

impl BeamFrame {
    /// Derives the frame from the input cloud and configuration.
    pub fn from_cloud(cloud: &ParticleCloud, cfg: &JdfConfig) -> Result<Self> {
        let z_extent = cloud.extent_z()?;
        if !(z_extent.span() > 0.0) {
            return Err(JdfError::config(
                "degenerate longitudinal domain: all particles share one z",
            ));
        }
        let stretched_extent = z_extent.stretched(cfg.stretch_factor);

        // γ per particle from SI momentum, then the beam mean.
        let n = cloud.len() as f64;
        let gamma_sum: f64 = cloud
            .px
            .iter()
            .zip(&cloud.py)
            .zip(&cloud.pz)
            .map(|((&px, &py), &pz)| {
                let p_tot = (px * px + py * py + pz * pz).sqrt();
                (1.0 + (p_tot / MOMENTUM_SCALE).powi(2)).sqrt()
            })
            .sum();
        let gamma0 = gamma_sum / n;

        let undulator_wavelength = 2.0 * PI / cfg.undulator_wavenumber;
        let resonant_wavelength = undulator_wavelength / (2.0 * gamma0 * gamma0)
            * (1.0 + cfg.undulator_parameter.powi(2) / 2.0);

        let n_slices =
            (cfg.slices_per_wavelength * stretched_extent.span() / resonant_wavelength) as usize;
        if n_slices == 0 {
            return Err(JdfError::config(format!(
                "resonant wavelength {resonant_wavelength:.3e} m exceeds the sliced beam length; \
                 increase slices_per_wavelength or the stretch factor"
            )));
        }
        // Slice planes subdivide the observed extent; the stretch only
        // widens the current histogram and the slice count.
        let slice_step = z_extent.span() / n_slices as f64;

        debug!(
            "beam frame: gamma0 = {gamma0:.4}, lambda_r = {resonant_wavelength:.4e} m, \
             {n_slices} slices of {slice_step:.4e} m"
        );

        Ok(BeamFrame {
            gamma0,
            undulator_wavelength,
            resonant_wavelength,
            n_slices,
            z_extent,
            stretched_extent,
            slice_step,
        })
    }

    /// Longitudinal position of slice `i`'s sampling plane.
    pub fn slice_z(&self, i: usize) -> f64 {
        self.z_extent.min + self.slice_step * i as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cold_line_cloud(n: usize) -> ParticleCloud {
        // Particles at rest spread along z over 1 m.
        let z: Vec<f64> = (0..n).map(|i| i as f64 / (n - 1) as f64).collect();
        let zeros = vec![0.0; n];
        ParticleCloud::new(
            zeros.clone(),
            zeros.clone(),
            zeros.clone(),
            zeros.clone(),
            z,
            zeros.clone(),
            vec![1.0; n],
        )
        .unwrap()
    }

    #[test]
    fn rest_beam_has_unit_gamma() {
        let frame = BeamFrame::from_cloud(&cold_line_cloud(100), &JdfConfig::default()).unwrap();
        assert_relative_eq!(frame.gamma0, 1.0, epsilon = 1e-12);
        // λ_u = 2π/k_u with the default wavenumber.
        assert_relative_eq!(
            frame.undulator_wavelength,
            2.0 * std::f64::consts::PI / 228.4727,
            epsilon = 1e-12
        );
    }

    #[test]
    fn slice_count_follows_resonance_formula() {
        let cfg = JdfConfig::default();
        let frame = BeamFrame::from_cloud(&cold_line_cloud(100), &cfg).unwrap();
        let expected =
            (cfg.slices_per_wavelength * 1.0 / frame.resonant_wavelength) as usize;
        assert_eq!(frame.n_slices, expected);
        assert!(frame.n_slices > 0);
        assert_relative_eq!(
            frame.slice_step * frame.n_slices as f64,
            frame.z_extent.span(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn slice_planes_start_at_min_z() {
        let frame = BeamFrame::from_cloud(&cold_line_cloud(50), &JdfConfig::default()).unwrap();
        assert_relative_eq!(frame.slice_z(0), frame.z_extent.min);
        assert!(frame.slice_z(frame.n_slices - 1) < frame.z_extent.max);
    }

    #[test]
    fn single_plane_beam_is_degenerate() {
        let zeros = vec![0.0; 10];
        let cloud = ParticleCloud::new(
            zeros.clone(),
            zeros.clone(),
            zeros.clone(),
            zeros.clone(),
            zeros.clone(),
            zeros.clone(),
            vec![1.0; 10],
        )
        .unwrap();
        assert!(BeamFrame::from_cloud(&cloud, &JdfConfig::default()).is_err());
    }
}
