//! Counting-statistics noise and charge conservation.
//!
//! Two seeded noise stages bracket the momentum mapping:
//! - longitudinal shot noise displaces each seed by
//!   `Δz · (u − 0.5) / √w` before momenta are interpolated, breaking the
//!   residual sub-slice regularity of the jittered planes;
//! - the charge normalizer perturbs each weight with a single Poisson
//!   draw, discards non-positive and undefined particles, and rescales
//!   the survivors so total charge is conserved exactly.
//!
//! Discards here are routine statistics, counted and logged, never errors.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::constants::ELEMENTARY_CHARGE;
use crate::errors::{JdfError, Result};
use crate::sampler::SliceSeed;
use crate::types::Particle;

/// A position seed with its interpolated momentum, prior to filtering.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub px: Option<f64>,
    pub py: Option<f64>,
    pub pz: Option<f64>,
    pub weight: f64,
}

/// Outcome counters for the normalization stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeReport {
    /// Particles whose post-noise weight was not strictly positive.
    pub discarded_nonpositive: usize,
    /// Particles with an undefined or non-finite attribute.
    pub discarded_undefined: usize,
    /// Uniform factor applied to surviving weights.
    pub charge_factor: f64,
    pub survivors: usize,
}

/// Displaces seed z positions by slice-step shot noise scaled with
/// 1/√weight, so heavily weighted seeds stay closer to their plane.
pub fn longitudinal_shot_noise(seeds: &mut [SliceSeed], slice_step: f64, rng: &mut StdRng) {
    for seed in seeds.iter_mut() {
        if seed.weight > 0.0 {
            seed.z += slice_step * (rng.gen::<f64>() - 0.5) / seed.weight.sqrt();
        }
    }
}

/// Applies Poisson weight noise, filters invalid particles, and rescales
/// the survivors' weights to conserve the original total charge.
pub fn normalize_charge(
    candidates: Vec<Candidate>,
    original_total_weight: f64,
    rng: &mut StdRng,
) -> Result<(Vec<Particle>, NormalizeReport)> {
    let mut discarded_nonpositive = 0usize;
    let mut discarded_undefined = 0usize;
    let mut survivors: Vec<Particle> = Vec::with_capacity(candidates.len());

    for c in candidates {
        let (Some(px), Some(py), Some(pz)) = (c.px, c.py, c.pz) else {
            discarded_undefined += 1;
            continue;
        };
        if !(c.weight > 0.0 && c.weight.is_finite()) {
            discarded_nonpositive += 1;
            continue;
        }
        let noisy_weight = Poisson::new(c.weight)
            .map_err(|e| JdfError::numerical(format!("Poisson draw for weight {}: {e}", c.weight)))?
            .sample(rng);
        if !(noisy_weight > 0.0) {
            discarded_nonpositive += 1;
            continue;
        }
        let attrs = [c.x, px, c.y, py, c.z, pz, noisy_weight];
        if attrs.iter().any(|v| !v.is_finite()) {
            discarded_undefined += 1;
            continue;
        }
        survivors.push(Particle {
            x: c.x,
            px,
            y: c.y,
            py,
            z: c.z,
            pz,
            weight: noisy_weight,
        });
    }

    debug!(
        "noise filter: {} survivors, {} non-positive, {} undefined",
        survivors.len(),
        discarded_nonpositive,
        discarded_undefined
    );

    let charge_factor = if survivors.is_empty() {
        1.0
    } else {
        let original_charge = original_total_weight * ELEMENTARY_CHARGE;
        let surviving_charge: f64 =
            survivors.iter().map(|p| p.weight).sum::<f64>() * ELEMENTARY_CHARGE;
        original_charge / surviving_charge
    };
    let survivors: Vec<Particle> = survivors
        .into_iter()
        .map(|p| Particle {
            weight: p.weight * charge_factor,
            ..p
        })
        .collect();

    info!("charge scaling factor = {charge_factor:.6}");
    let report = NormalizeReport {
        discarded_nonpositive,
        discarded_undefined,
        charge_factor,
        survivors: survivors.len(),
    };
    Ok((survivors, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn candidate(weight: f64) -> Candidate {
        Candidate {
            x: 0.1,
            y: 0.2,
            z: 0.3,
            px: Some(1.0),
            py: Some(-1.0),
            pz: Some(2.0),
            weight,
        }
    }

    #[test]
    fn charge_is_conserved_after_noise_and_filtering() {
        let mut rng = StdRng::seed_from_u64(7);
        let candidates: Vec<Candidate> = (0..500).map(|_| candidate(40.0)).collect();
        let original_total = 500.0 * 40.0;
        let (survivors, report) = normalize_charge(candidates, original_total, &mut rng).unwrap();
        assert!(!survivors.is_empty());
        let total: f64 = survivors.iter().map(|p| p.weight).sum();
        assert_relative_eq!(total, original_total, epsilon = 1e-6);
        assert_eq!(report.survivors, survivors.len());
    }

    #[test]
    fn undefined_momentum_is_discarded_not_coerced() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut bad = candidate(10.0);
        bad.py = None;
        let (survivors, report) =
            normalize_charge(vec![candidate(10.0), bad], 20.0, &mut rng).unwrap();
        assert_eq!(report.discarded_undefined, 1);
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn non_positive_weights_are_routine_discards() {
        let mut rng = StdRng::seed_from_u64(11);
        let (survivors, report) =
            normalize_charge(vec![candidate(0.0), candidate(-1.0)], 0.0, &mut rng).unwrap();
        assert!(survivors.is_empty());
        assert_eq!(report.discarded_nonpositive, 2);
        assert_eq!(report.charge_factor, 1.0);
    }

    #[test]
    fn nan_position_is_filtered() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut bad = candidate(10.0);
        bad.y = f64::NAN;
        let (survivors, report) = normalize_charge(vec![bad], 10.0, &mut rng).unwrap();
        assert!(survivors.is_empty());
        assert_eq!(report.discarded_undefined, 1);
    }

    #[test]
    fn shot_noise_is_bounded_and_seeded() {
        let seeds: Vec<SliceSeed> = (0..100)
            .map(|i| SliceSeed {
                x: 0.0,
                y: 0.0,
                z: i as f64,
                weight: 4.0,
            })
            .collect();
        let mut a = seeds.clone();
        let mut b = seeds.clone();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        longitudinal_shot_noise(&mut a, 0.1, &mut rng_a);
        longitudinal_shot_noise(&mut b, 0.1, &mut rng_b);
        for (sa, (sb, orig)) in a.iter().zip(b.iter().zip(&seeds)) {
            assert_eq!(sa.z, sb.z);
            // |Δz| <= step * 0.5 / sqrt(w)
            assert!((sa.z - orig.z).abs() <= 0.1 * 0.5 / 2.0 + 1e-12);
        }
    }

    #[test]
    fn poisson_noise_changes_individual_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let (survivors, _) =
            normalize_charge((0..50).map(|_| candidate(25.0)).collect(), 1250.0, &mut rng)
                .unwrap();
        // Not every survivor should sit exactly at the rescaled mean.
        let distinct: std::collections::HashSet<u64> =
            survivors.iter().map(|p| p.weight.to_bits()).collect();
        assert!(distinct.len() > 1);
    }
}
