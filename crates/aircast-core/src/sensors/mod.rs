//! Sensor driver boundary and the concrete SCD30 driver.

mod scd30;

use core::fmt::Debug;

use crate::reading::SensorReading;

pub use scd30::{SCD30_I2C_ADDR, Scd30, Scd30Error};

/// What the acquisition loop needs from a CO2 sensor.
///
/// Errors are only ever logged and counted as "not success", so the error
/// type just has to be printable.
pub trait Co2Sensor {
    type Error: Debug;

    /// Bring the sensor into a known state. Also used to recover a sensor
    /// that stopped answering.
    fn init(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Set the interval at which the sensor produces new measurements.
    fn set_measurement_interval(
        &mut self,
        seconds: u16,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Start continuous measurement. `ambient_pressure_mbar == 0` disables
    /// pressure compensation.
    fn start_periodic_measurement(
        &mut self,
        ambient_pressure_mbar: u16,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Leave continuous measurement. Measurement resumes only after another
    /// start.
    fn stop_periodic_measurement(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Wait for the next measurement and read it.
    ///
    /// This blocks (asynchronously) for up to one measurement interval, which
    /// is what paces the acquisition loop.
    fn blocking_read_measurement(
        &mut self,
    ) -> impl Future<Output = Result<SensorReading, Self::Error>>;
}
