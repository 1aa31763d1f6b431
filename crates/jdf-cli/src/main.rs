//! JDF CLI entry point.
//!
//! Reads a macroparticle beam table, upsamples it through the resampling
//! pipeline, and writes the new table plus provenance metadata.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use jdf_core::{JdfConfig, Resampler};
use jdf_io::{default_output_path, read_particle_table, write_particle_table, RunMetadata};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "jdf")]
#[command(version = VERSION)]
#[command(about = "Upsample a macroparticle beam's 6D phase space", long_about = None)]
struct Args {
    /// Input particle table (CSV: x, px, y, py, z, pz, ne).
    input: PathBuf,

    /// Optional TOML parameter file; absent fields take defaults.
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Output table path (default: <input stem>_JDF_<seed>.csv).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the noise RNG seed from the parameter file.
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<JdfConfig> {
    let mut cfg = match &args.params {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading parameter file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("parsing parameter file {}", path.display()))?
        }
        None => JdfConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.rng_seed = Some(seed);
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .init();

    let cfg = load_config(&args)?;
    info!("processing file: {}", args.input.display());
    info!(
        "parameters: k_u = {}, a_u = {}, slices/wavelength = {}, particles/slice = {}, \
         bins = {}x{}x{}, stretch = {}",
        cfg.undulator_wavenumber,
        cfg.undulator_parameter,
        cfg.slices_per_wavelength,
        cfg.slice_particle_count,
        cfg.bins_x,
        cfg.bins_y,
        cfg.bins_z,
        cfg.stretch_factor
    );

    let cloud = read_particle_table(&args.input)?;
    let start = Instant::now();
    let output = Resampler::new(cfg)?.run(&cloud)?;

    let out_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, output.report.seed));
    let metadata = RunMetadata::from_report(&args.input, &output.report);
    write_particle_table(&out_path, &output.particles, &metadata)?;

    info!(
        "{} particles from {} active slices in {:.2?} (charge factor {:.6})",
        output.report.survivors,
        output.report.active_slices,
        start.elapsed(),
        output.report.charge_factor
    );
    Ok(())
}
