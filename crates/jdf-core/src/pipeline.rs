//! End-to-end resampling pipeline.
//!
//! Wires the stages in dependency order: beam frame and current profile
//! first (both cheap), then the 3D density field, the parallel slice
//! fan-out, momentum mapping, and charge normalization. Derived fields
//! are built once and read-only for the remainder of the run; the run is
//! all-or-nothing — the first worker failure aborts it.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::beam::BeamFrame;
use crate::config::JdfConfig;
use crate::density::DensityField;
use crate::errors::Result;
use crate::halton;
use crate::momentum::MomentumMapper;
use crate::noise::{self, Candidate, NormalizeReport};
use crate::orchestrator;
use crate::profile::LongitudinalProfile;
use crate::sampler::SliceSampler;
use crate::types::{Particle, ParticleCloud};

/// Summary of one resampling run, suitable for logging and provenance
/// metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Seed actually used for the noise stages.
    pub seed: u64,
    /// Mean Lorentz factor of the input beam.
    pub gamma0: f64,
    /// Resonant wavelength \[m\] that set the slice width.
    pub resonant_wavelength: f64,
    /// Total longitudinal slices in the domain.
    pub n_slices: usize,
    /// Slices with positive electron count that were sampled.
    pub active_slices: usize,
    /// Seeds generated before noise filtering.
    pub generated: usize,
    /// Final particle count.
    pub survivors: usize,
    pub discarded_nonpositive: usize,
    pub discarded_undefined: usize,
    /// Uniform weight factor that restored the original charge.
    pub charge_factor: f64,
}

/// The resampled beam plus its run report.
#[derive(Debug, Clone)]
pub struct ResampleOutput {
    pub particles: Vec<Particle>,
    pub report: RunReport,
}

/// Statistical upsampler for a fixed beam snapshot.
pub struct Resampler {
    cfg: JdfConfig,
}

impl Resampler {
    /// Validates the configuration once; fatal errors surface here,
    /// before any parallel work.
    pub fn new(cfg: JdfConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Resampler { cfg })
    }

    pub fn config(&self) -> &JdfConfig {
        &self.cfg
    }

    /// Runs the full resampling pipeline on an input cloud.
    pub fn run(&self, cloud: &ParticleCloud) -> Result<ResampleOutput> {
        let cfg = &self.cfg;
        let seed = cfg.rng_seed.unwrap_or_else(rand::random);
        info!("noise RNG seed = {seed}");

        let frame = BeamFrame::from_cloud(cloud, cfg)?;
        info!(
            "gamma0 = {:.4}, resonant wavelength = {:.4e} m, {} slices",
            frame.gamma0, frame.resonant_wavelength, frame.n_slices
        );

        let profile =
            LongitudinalProfile::build(&cloud.z, &cloud.weight, cfg.bins_z, cfg.stretch_factor)?;
        let plans = orchestrator::plan_slices(&profile, &frame, cfg);
        if plans.is_empty() {
            // Every slice's electron count is <= 0 (e.g. all weights
            // zero): a valid run that produces no particles.
            warn!("no slice carries positive current; output is empty");
            return Ok(ResampleOutput {
                particles: Vec::new(),
                report: RunReport {
                    seed,
                    gamma0: frame.gamma0,
                    resonant_wavelength: frame.resonant_wavelength,
                    n_slices: frame.n_slices,
                    active_slices: 0,
                    generated: 0,
                    survivors: 0,
                    discarded_nonpositive: 0,
                    discarded_undefined: 0,
                    charge_factor: 1.0,
                },
            });
        }

        let density = DensityField::build(cloud, (cfg.bins_x, cfg.bins_y, cfg.bins_z))?;
        let quasi_pairs = halton::transverse_pairs(cfg.slice_particle_count);
        let jitter = halton::jitter_stream(cfg.slice_particle_count);
        let sampler = SliceSampler::new(
            &density,
            (cfg.bins_x, cfg.bins_y),
            cfg.oversampling,
            &quasi_pairs,
            &jitter,
            frame.slice_step,
        );

        let mut seeds = orchestrator::run_slices(&sampler, &plans)?;
        let generated = seeds.len();
        info!("generated {generated} seeds from {} active slices", plans.len());

        let mut rng = StdRng::seed_from_u64(seed);
        noise::longitudinal_shot_noise(&mut seeds, frame.slice_step, &mut rng);

        let mapper = MomentumMapper::new(cloud)?;
        let positions: Vec<[f64; 3]> = seeds.iter().map(|s| [s.x, s.y, s.z]).collect();
        let mapped = mapper.map(&positions);

        let candidates: Vec<Candidate> = seeds
            .iter()
            .enumerate()
            .map(|(i, s)| Candidate {
                x: s.x,
                y: s.y,
                z: s.z,
                px: mapped.px[i],
                py: mapped.py[i],
                pz: mapped.pz[i],
                weight: s.weight,
            })
            .collect();

        let (particles, nreport) =
            noise::normalize_charge(candidates, cloud.total_weight(), &mut rng)?;
        log_outcome(generated, &nreport);

        Ok(ResampleOutput {
            particles,
            report: RunReport {
                seed,
                gamma0: frame.gamma0,
                resonant_wavelength: frame.resonant_wavelength,
                n_slices: frame.n_slices,
                active_slices: plans.len(),
                generated,
                survivors: nreport.survivors,
                discarded_nonpositive: nreport.discarded_nonpositive,
                discarded_undefined: nreport.discarded_undefined,
                charge_factor: nreport.charge_factor,
            },
        })
    }
}

fn log_outcome(generated: usize, report: &NormalizeReport) {
    info!(
        "{} of {generated} seeds survived ({} non-positive, {} undefined), \
         charge factor {:.6}",
        report.survivors,
        report.discarded_nonpositive,
        report.discarded_undefined,
        report.charge_factor
    );
}
