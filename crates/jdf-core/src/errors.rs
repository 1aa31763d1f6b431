//! Error types for the JDF resampling engine.
//!
//! One unified enum so callers can pattern-match on failure modes. Fatal
//! configuration problems (unsupported Halton dimensionality, degenerate
//! input domain) are reported before any parallel work starts; statistical
//! discards during noise injection are *not* errors and are counted in the
//! run report instead.

use thiserror::Error;

/// Unified error type for all resampling operations.
#[derive(Error, Debug)]
pub enum JdfError {
    /// Invalid configuration or degenerate input domain; fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Numerical anomaly (non-monotone CDF, non-finite intermediate).
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Particle table parsing errors (row number and cause).
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors at the file boundary.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JdfError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        JdfError::Config(message.into())
    }

    /// Creates a numerical error.
    pub fn numerical(message: impl Into<String>) -> Self {
        JdfError::Numerical(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        JdfError::Parse(message.into())
    }
}

/// Result type alias for resampling operations.
pub type Result<T> = std::result::Result<T, JdfError>;
