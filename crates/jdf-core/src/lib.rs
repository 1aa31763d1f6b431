//! # jdf-core
//!
//! Statistical upsampling of a macroparticle electron beam's 6D phase space.
//!
//! Given a coarse weighted particle cloud, the engine reconstructs a larger,
//! smoother ensemble that preserves the measured spatial density, the
//! longitudinal current profile, and the total beam charge:
//!
//! - **Density estimation**: weighted 3D histogram, Gaussian smoothing,
//!   nearest-neighbor scattered interpolation ([`density`])
//! - **Current profile**: 1D histogram + shape-preserving monotone cubic
//!   interpolant along z ([`profile`])
//! - **Per-slice JDF sampling**: nested inverse-CDF draws at quasi-random
//!   Halton coordinates ([`sampler`], [`halton`])
//! - **Parallel fan-out** over independent longitudinal slices
//!   ([`orchestrator`])
//! - **Momentum mapping** onto the new positions by local linear
//!   least-squares ([`momentum`])
//! - **Charge-conserving noise injection** on particle weights ([`noise`])
//!
//! [`pipeline::Resampler`] wires the stages together; file IO and CLI
//! surfaces live in the `jdf-io` and `jdf-cli` crates.

pub mod beam;
pub mod config;
pub mod constants;
pub mod density;
pub mod errors;
pub mod halton;
pub mod interp;
pub mod kdtree;
pub mod momentum;
pub mod noise;
pub mod orchestrator;
pub mod pipeline;
pub mod profile;
pub mod sampler;
pub mod smooth;
pub mod types;

pub use beam::BeamFrame;
pub use config::JdfConfig;
pub use errors::{JdfError, Result};
pub use pipeline::{Resampler, ResampleOutput, RunReport};
pub use types::{AxisExtent, Particle, ParticleCloud};
