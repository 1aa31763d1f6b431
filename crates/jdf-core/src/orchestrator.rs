//! Parallel fan-out of slice sampling across the rayon worker pool.
//!
//! Each active slice (positive electron count) is an independent,
//! read-only-input work unit returning a self-contained seed batch. The
//! parallel map returns batches indexed by plan position, but every seed
//! carries its own position and weight, so the merge treats the batches
//! as an unordered bag; nothing downstream may depend on slice order.
//! The first worker error aborts the whole run — a silently missing slice
//! would corrupt the charge-conservation invariant.

use log::info;
use rayon::prelude::*;

use crate::beam::BeamFrame;
use crate::config::JdfConfig;
use crate::errors::Result;
use crate::profile::LongitudinalProfile;
use crate::sampler::{SlicePlan, SliceSampler, SliceSeed};

/// Work orders for every slice whose electron count is positive. Empty or
/// noise-dominated longitudinal regions plan no work and contribute
/// nothing, by design.
pub fn plan_slices(
    profile: &LongitudinalProfile,
    frame: &BeamFrame,
    cfg: &JdfConfig,
) -> Vec<SlicePlan> {
    let scale = profile.nonzero_bins as f64
        / (frame.n_slices as f64 * cfg.slice_particle_count as f64);
    (0..frame.n_slices)
        .filter_map(|i| {
            let z = frame.slice_z(i);
            let electrons_per_particle = scale * profile.query(z);
            (electrons_per_particle > 0.0).then_some(SlicePlan {
                index: i,
                z,
                electrons_per_particle,
            })
        })
        .collect()
}

/// Runs the sampler over all planned slices in parallel and merges the
/// batches into one unordered seed collection.
pub fn run_slices(sampler: &SliceSampler<'_>, plans: &[SlicePlan]) -> Result<Vec<SliceSeed>> {
    run_with(plans, |plan| sampler.sample(plan))
}

/// Parallel fan-out of an arbitrary slice worker. The first worker error
/// aborts the whole run; no partial seed collection escapes.
fn run_with<F>(plans: &[SlicePlan], worker: F) -> Result<Vec<SliceSeed>>
where
    F: Fn(&SlicePlan) -> Result<Vec<SliceSeed>> + Sync,
{
    info!(
        "dispatching {} active slices across {} workers",
        plans.len(),
        rayon::current_num_threads()
    );
    let batches: Vec<Vec<SliceSeed>> = plans
        .par_iter()
        .map(|plan| worker(plan))
        .collect::<Result<_>>()?;
    Ok(merge_batches(batches))
}

/// Concatenates per-slice batches. Merge order is irrelevant to
/// correctness; the output is consumed as a set.
pub fn merge_batches(batches: Vec<Vec<SliceSeed>>) -> Vec<SliceSeed> {
    batches.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::DensityField;
    use crate::errors::JdfError;
    use crate::halton;
    use crate::types::ParticleCloud;

    fn lattice_cloud() -> ParticleCloud {
        let n_side = 10;
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut z = Vec::new();
        for i in 0..n_side {
            for j in 0..n_side {
                for k in 0..n_side {
                    x.push(i as f64 / 9.0);
                    y.push(j as f64 / 9.0);
                    z.push(k as f64 / 9.0);
                }
            }
        }
        let n = x.len();
        ParticleCloud::new(
            x,
            vec![0.0; n],
            y,
            vec![0.0; n],
            z,
            vec![0.0; n],
            vec![1.0; n],
        )
        .unwrap()
    }

    #[test]
    fn planner_skips_non_positive_slices() {
        let cloud = lattice_cloud();
        let profile = LongitudinalProfile::build(&cloud.z, &cloud.weight, 10, 0.0).unwrap();
        let cfg = JdfConfig {
            slices_per_wavelength: 1.0,
            slice_particle_count: 10,
            ..JdfConfig::default()
        };
        let frame = BeamFrame::from_cloud(&cloud, &cfg).unwrap();
        let plans = plan_slices(&profile, &frame, &cfg);
        assert!(!plans.is_empty());
        assert!(plans.len() <= frame.n_slices);
        for p in &plans {
            assert!(p.electrons_per_particle > 0.0);
        }

        // Zero weights: every electron count is <= 0, nothing planned.
        let zeros = vec![0.0; cloud.len()];
        let empty_profile = LongitudinalProfile::build(&cloud.z, &zeros, 10, 0.0).unwrap();
        assert!(plan_slices(&empty_profile, &frame, &cfg).is_empty());
    }

    #[test]
    fn merge_is_order_insensitive() {
        let cloud = lattice_cloud();
        let field = DensityField::build(&cloud, (8, 8, 8)).unwrap();
        let pairs = halton::transverse_pairs(20);
        let jitter = halton::jitter_stream(20);
        let sampler = SliceSampler::new(&field, (8, 8), 1.0, &pairs, &jitter, 0.05);

        let plans: Vec<SlicePlan> = (0..6)
            .map(|i| SlicePlan {
                index: i,
                z: 0.1 + 0.15 * i as f64,
                electrons_per_particle: 1.0,
            })
            .collect();

        let batches: Vec<Vec<SliceSeed>> = plans
            .iter()
            .map(|p| sampler.sample(p).unwrap())
            .collect();
        let forward = merge_batches(batches.clone());
        let mut reversed_batches = batches;
        reversed_batches.reverse();
        let reversed = merge_batches(reversed_batches);

        // Equal as sets: same seeds regardless of completion order.
        let key = |s: &SliceSeed| (s.x.to_bits(), s.y.to_bits(), s.z.to_bits());
        let mut a: Vec<_> = forward.iter().map(key).collect();
        let mut b: Vec<_> = reversed.iter().map(key).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn failing_slice_aborts_the_whole_run() {
        let plans: Vec<SlicePlan> = (0..8)
            .map(|i| SlicePlan {
                index: i,
                z: 0.1 * i as f64,
                electrons_per_particle: 1.0,
            })
            .collect();

        // One poisoned slice among healthy ones: its error must surface
        // as the run's error, and no partial seed set may leak out.
        let result = run_with(&plans, |plan| {
            if plan.index == 5 {
                Err(JdfError::numerical("cumulative distribution decreases"))
            } else {
                Ok(vec![SliceSeed {
                    x: 0.0,
                    y: 0.0,
                    z: plan.z,
                    weight: plan.electrons_per_particle,
                }])
            }
        });
        let err = result.unwrap_err();
        assert!(matches!(err, JdfError::Numerical(_)));
        assert!(err.to_string().contains("decreases"));

        // The same plans with healthy workers complete in full.
        let ok = run_with(&plans, |plan| {
            Ok(vec![SliceSeed {
                x: 0.0,
                y: 0.0,
                z: plan.z,
                weight: plan.electrons_per_particle,
            }])
        })
        .unwrap();
        assert_eq!(ok.len(), plans.len());
    }

    #[test]
    fn parallel_run_matches_serial_sampling() {
        let cloud = lattice_cloud();
        let field = DensityField::build(&cloud, (8, 8, 8)).unwrap();
        let pairs = halton::transverse_pairs(15);
        let jitter = halton::jitter_stream(15);
        let sampler = SliceSampler::new(&field, (8, 8), 1.0, &pairs, &jitter, 0.05);
        let plans: Vec<SlicePlan> = (0..4)
            .map(|i| SlicePlan {
                index: i,
                z: 0.2 * i as f64 + 0.1,
                electrons_per_particle: 0.5,
            })
            .collect();

        let parallel = run_slices(&sampler, &plans).unwrap();
        let serial: Vec<SliceSeed> = plans
            .iter()
            .flat_map(|p| sampler.sample(p).unwrap())
            .collect();
        assert_eq!(parallel.len(), serial.len());
        // Halton draws are deterministic, so the sets coincide exactly.
        let key = |s: &SliceSeed| (s.x.to_bits(), s.y.to_bits(), s.z.to_bits());
        let mut a: Vec<_> = parallel.iter().map(key).collect();
        let mut b: Vec<_> = serial.iter().map(key).collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
}
