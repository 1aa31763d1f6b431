//! Resampled table writer and provenance metadata.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use jdf_core::constants::MOMENTUM_SCALE;
use jdf_core::{JdfError, Particle, Result, RunReport};

/// Provenance recorded next to every output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub source_file: String,
    /// ISO-8601 UTC generation timestamp.
    pub generated_at: String,
    pub seed: u64,
    pub charge_factor: f64,
    pub n_particles: usize,
    pub column_labels: String,
}

impl RunMetadata {
    pub fn from_report(source: &Path, report: &RunReport) -> Self {
        RunMetadata {
            source_file: source.display().to_string(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            seed: report.seed,
            charge_factor: report.charge_factor,
            n_particles: report.survivors,
            column_labels: "x,px,y,py,z,pz,ne".to_string(),
        }
    }
}

/// Default output table path: `<input stem>_JDF_<seed>.csv` beside the
/// input file.
pub fn default_output_path(input: &Path, seed: u64) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "beam".to_string());
    input.with_file_name(format!("{stem}_JDF_{seed}.csv"))
}

/// Writes the resampled particles as a 7-column CSV (momentum rescaled
/// back to p/(m·c)) plus a JSON metadata sidecar at `<output>.json`.
pub fn write_particle_table(
    path: &Path,
    particles: &[Particle],
    metadata: &RunMetadata,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| JdfError::parse(format!("{}: {e}", path.display())))?;
    for p in particles {
        writer
            .write_record(&[
                p.x.to_string(),
                (p.px / MOMENTUM_SCALE).to_string(),
                p.y.to_string(),
                (p.py / MOMENTUM_SCALE).to_string(),
                p.z.to_string(),
                (p.pz / MOMENTUM_SCALE).to_string(),
                p.weight.to_string(),
            ])
            .map_err(|e| JdfError::parse(format!("{}: {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| JdfError::parse(format!("{}: {e}", path.display())))?;

    let sidecar = metadata_path(path);
    let file = std::fs::File::create(&sidecar)?;
    serde_json::to_writer_pretty(file, metadata)
        .map_err(|e| JdfError::parse(format!("{}: {e}", sidecar.display())))?;

    info!(
        "wrote {} particles to {} (metadata: {})",
        particles.len(),
        path.display(),
        sidecar.display()
    );
    Ok(())
}

fn metadata_path(output: &Path) -> PathBuf {
    let mut os = output.as_os_str().to_owned();
    os.push(".json");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_particle_table;
    use tempfile::TempDir;

    fn report() -> RunReport {
        RunReport {
            seed: 99,
            gamma0: 1.0,
            resonant_wavelength: 1e-2,
            n_slices: 10,
            active_slices: 8,
            generated: 800,
            survivors: 2,
            discarded_nonpositive: 1,
            discarded_undefined: 0,
            charge_factor: 1.25,
        }
    }

    #[test]
    fn roundtrip_preserves_attributes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let particles = vec![
            Particle {
                x: 0.1,
                px: 2.0 * MOMENTUM_SCALE,
                y: 0.2,
                py: -1.0 * MOMENTUM_SCALE,
                z: 0.3,
                pz: 50.0 * MOMENTUM_SCALE,
                weight: 7.5,
            },
            Particle {
                x: -0.4,
                px: 0.0,
                y: 0.5,
                py: 0.25 * MOMENTUM_SCALE,
                z: 0.6,
                pz: 51.0 * MOMENTUM_SCALE,
                weight: 8.5,
            },
        ];
        let meta = RunMetadata::from_report(Path::new("input.csv"), &report());
        write_particle_table(&path, &particles, &meta).unwrap();

        let cloud = read_particle_table(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert!((cloud.x[0] - 0.1).abs() < 1e-15);
        assert!((cloud.px[0] - particles[0].px).abs() / particles[0].px.abs() < 1e-12);
        assert!((cloud.weight[1] - 8.5).abs() < 1e-15);
    }

    #[test]
    fn sidecar_records_provenance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let meta = RunMetadata::from_report(Path::new("source_beam.csv"), &report());
        write_particle_table(&path, &[], &meta).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("out.csv.json")).unwrap();
        let parsed: RunMetadata = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.source_file, "source_beam.csv");
        assert_eq!(parsed.seed, 99);
        assert_eq!(parsed.charge_factor, 1.25);
        assert!(parsed.generated_at.contains('T'));
    }

    #[test]
    fn default_name_embeds_stem_and_seed() {
        let out = default_output_path(Path::new("/data/run7/beam.csv"), 123);
        assert_eq!(out, Path::new("/data/run7/beam_JDF_123.csv"));
    }
}
