//! Particle table reader.

use std::path::Path;

use log::info;

use jdf_core::constants::MOMENTUM_SCALE;
use jdf_core::{JdfError, ParticleCloud, Result};

/// Reads a 7-column CSV particle table into a cloud, descaling momentum
/// from p/(m·c) to SI. Lines starting with `#` are comments; parse
/// failures report the offending row.
pub fn read_particle_table(path: &Path) -> Result<ParticleCloud> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| JdfError::parse(format!("{}: {e}", path.display())))?;

    let mut x = Vec::new();
    let mut px = Vec::new();
    let mut y = Vec::new();
    let mut py = Vec::new();
    let mut z = Vec::new();
    let mut pz = Vec::new();
    let mut weight = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| JdfError::parse(format!("row {}: {e}", row + 1)))?;
        if record.len() != 7 {
            return Err(JdfError::parse(format!(
                "row {}: expected 7 columns, found {}",
                row + 1,
                record.len()
            )));
        }
        let mut fields = [0.0f64; 7];
        for (col, field) in record.iter().enumerate() {
            fields[col] = field.parse().map_err(|_| {
                JdfError::parse(format!("row {}: column {} is not a number: {field:?}", row + 1, col + 1))
            })?;
        }
        let [xv, pxv, yv, pyv, zv, pzv, wv] = fields;
        x.push(xv);
        px.push(pxv * MOMENTUM_SCALE);
        y.push(yv);
        py.push(pyv * MOMENTUM_SCALE);
        z.push(zv);
        pz.push(pzv * MOMENTUM_SCALE);
        weight.push(wv);
    }

    let cloud = ParticleCloud::new(x, px, y, py, z, pz, weight)?;
    info!("read {} particles from {}", cloud.len(), path.display());
    Ok(cloud)
}
