//! Peripheral setup for the aircast device
//!
//! The SCD30 hangs off I2C0 on GPIO12 (SDA) / GPIO11 (SCL); the liveness LED
//! is a plain push-pull output.

use aircast_core::async_i2c_bus::AsyncI2cDevice;
use aircast_core::sensors::Scd30;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;
use esp_hal::gpio::{Level, Output, OutputConfig, OutputPin};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::Async;
use log::info;
use static_cell::StaticCell;

use super::AppError;

/// The SCD30 does not support fast mode.
const SENSOR_BUS_KHZ: u32 = 100;

pub type SensorBus = I2c<'static, Async>;
pub type SensorI2c = AsyncI2cDevice<'static, CriticalSectionRawMutex, SensorBus>;
pub type FirmwareSensor = Scd30<SensorI2c, embassy_time::Delay>;

/// Initialize the I2C bus hardware
///
/// Creates the I2C peripheral with proper configuration
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO12<'static>,
    scl: esp_hal::peripherals::GPIO11<'static>,
) -> Result<SensorBus, AppError> {
    let bus = I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(SENSOR_BUS_KHZ)),
    )
    .map_err(AppError::hardware)?
    .with_sda(sda)
    .with_scl(scl)
    .into_async();
    Ok(bus)
}

/// Park the bus in a static and hand out the sensor's device on it.
///
/// May only be called once.
pub fn init_sensor(bus: SensorBus) -> FirmwareSensor {
    static I2C0_BUS: StaticCell<AsyncMutex<CriticalSectionRawMutex, SensorBus>> =
        StaticCell::new();
    let i2c0_bus = I2C0_BUS.init(AsyncMutex::new(bus));

    info!("SCD30 attached at {} kHz", SENSOR_BUS_KHZ);
    Scd30::new(AsyncI2cDevice::new(i2c0_bus), embassy_time::Delay)
}

/// Liveness LED, starting dark.
pub fn liveness_led(pin: impl OutputPin + 'static) -> Output<'static> {
    Output::new(pin, Level::Low, OutputConfig::default())
}
