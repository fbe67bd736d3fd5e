//! The value produced by one successful sampling cycle.

use serde::{Deserialize, Serialize};

/// One CO2 / temperature / humidity sample.
///
/// Readings are plain `Copy` values: the acquisition loop builds a new one for
/// every successful read and the previous one is simply superseded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    /// CO2 concentration in parts per million
    pub co2_ppm: f32,
    /// Temperature in degrees Celsius
    pub temperature_c: f32,
    /// Relative humidity in percent
    pub humidity_pct: f32,
}

impl SensorReading {
    /// Served when nothing has been sampled yet.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(co2_ppm: f32, temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            co2_ppm,
            temperature_c,
            humidity_pct,
        }
    }

    /// Whether all three values are finite.
    ///
    /// The sensor occasionally hands back NaN while warming up. Such readings
    /// are still published and served as-is; this is only used for logging.
    pub fn is_valid(&self) -> bool {
        self.co2_ppm.is_finite() && self.temperature_c.is_finite() && self.humidity_pct.is_finite()
    }
}
