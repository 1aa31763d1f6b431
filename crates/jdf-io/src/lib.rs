//! # jdf-io
//!
//! File boundary for the JDF resampler: reading the 7-column particle
//! table, writing the resampled table, and recording run provenance.
//!
//! Tables are CSV with columns `x, px, y, py, z, pz, ne`; momentum is
//! stored as the dimensionless p/(m·c) and descaled to SI on load. Each
//! output table is accompanied by a JSON sidecar carrying provenance
//! (source file, generation timestamp, seed, charge factor).

pub mod reader;
pub mod writer;

pub use reader::read_particle_table;
pub use writer::{default_output_path, write_particle_table, RunMetadata};
