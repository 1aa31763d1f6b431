//! Physical constants (SI units).

/// Speed of light in vacuum \[m/s\].
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Electron rest mass \[kg\].
pub const ELECTRON_MASS: f64 = 9.11e-31;

/// Elementary charge \[C\].
pub const ELEMENTARY_CHARGE: f64 = 1.602e-19;

/// Vacuum permittivity \[F/m\].
pub const VACUUM_PERMITTIVITY: f64 = 8.854e-12;

/// Conversion between the dimensionless p/(m·c) momentum stored in particle
/// tables and SI momentum \[kg·m/s\].
pub const MOMENTUM_SCALE: f64 = ELECTRON_MASS * SPEED_OF_LIGHT;
