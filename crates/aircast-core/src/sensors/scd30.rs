use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};
use log::{debug, info};
use thiserror_no_std::Error;

use super::Co2Sensor;
use crate::reading::SensorReading;

/// Fixed I2C address of the SCD30
pub const SCD30_I2C_ADDR: u8 = 0x61;

const CMD_START_PERIODIC_MEASUREMENT: u16 = 0x0010;
const CMD_STOP_PERIODIC_MEASUREMENT: u16 = 0x0104;
const CMD_SET_MEASUREMENT_INTERVAL: u16 = 0x4600;
const CMD_GET_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASUREMENT: u16 = 0x0300;
const CMD_SOFT_RESET: u16 = 0xD304;

/// The SCD30 needs a pause between a command write and the matching read.
const COMMAND_EXECUTION_TIME_MS: u32 = 3;
const SOFT_RESET_TIME_MS: u32 = 2000;
const DATA_READY_POLL_INTERVAL_MS: u32 = 100;

const MIN_INTERVAL_SECS: u16 = 2;
const MAX_INTERVAL_SECS: u16 = 1800;
const MIN_PRESSURE_MBAR: u16 = 700;
const MAX_PRESSURE_MBAR: u16 = 1400;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scd30Error {
    #[error("I2C transfer failed: {0:?}")]
    I2c(ErrorKind),
    #[error("CRC mismatch in sensor response")]
    Crc,
    #[error("no measurement ready after {0} ms")]
    Timeout(u32),
    #[error("argument out of range")]
    InvalidArgument,
}

/// Sensirion SCD30 NDIR CO2 sensor on an async I2C bus.
///
/// Every 16-bit word on the wire, in either direction, is followed by a CRC-8
/// byte. Measurements are three big-endian IEEE-754 floats, each split over
/// two words.
pub struct Scd30<I, D> {
    i2c: I,
    delay: D,
    interval_secs: u16,
}

impl<I: I2c, D: DelayNs> Scd30<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            interval_secs: MIN_INTERVAL_SECS,
        }
    }

    /// How long `blocking_read_measurement` waits for data before giving up.
    ///
    /// Two full intervals plus a second of slack.
    fn data_ready_timeout_ms(&self) -> u32 {
        u32::from(self.interval_secs) * 2000 + 1000
    }

    async fn write_command(&mut self, command: u16) -> Result<(), Scd30Error> {
        self.i2c
            .write(SCD30_I2C_ADDR, &command.to_be_bytes())
            .await
            .map_err(|e| Scd30Error::I2c(e.kind()))
    }

    async fn write_command_with_arg(&mut self, command: u16, arg: u16) -> Result<(), Scd30Error> {
        let [c0, c1] = command.to_be_bytes();
        let [a0, a1] = arg.to_be_bytes();
        let frame = [c0, c1, a0, a1, crc8(&[a0, a1])];

        self.i2c
            .write(SCD30_I2C_ADDR, &frame)
            .await
            .map_err(|e| Scd30Error::I2c(e.kind()))
    }

    /// Issue `command` and read back `N` CRC-checked words.
    async fn read_words<const N: usize>(&mut self, command: u16) -> Result<[u16; N], Scd30Error> {
        self.write_command(command).await?;
        self.delay.delay_ms(COMMAND_EXECUTION_TIME_MS).await;

        // Three bytes per word; 6 words is the largest response we read.
        let mut buf = [0u8; 18];
        let raw = &mut buf[..N * 3];
        self.i2c
            .read(SCD30_I2C_ADDR, raw)
            .await
            .map_err(|e| Scd30Error::I2c(e.kind()))?;

        let mut words = [0u16; N];
        for (word, chunk) in words.iter_mut().zip(raw.chunks_exact(3)) {
            if crc8(&chunk[..2]) != chunk[2] {
                return Err(Scd30Error::Crc);
            }
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Ok(words)
    }

    pub async fn data_ready(&mut self) -> Result<bool, Scd30Error> {
        let [status] = self.read_words::<1>(CMD_GET_DATA_READY).await?;
        Ok(status == 1)
    }

    pub async fn read_measurement(&mut self) -> Result<SensorReading, Scd30Error> {
        let words = self.read_words::<6>(CMD_READ_MEASUREMENT).await?;
        let float = |hi: u16, lo: u16| f32::from_bits((u32::from(hi) << 16) | u32::from(lo));

        Ok(SensorReading::new(
            float(words[0], words[1]),
            float(words[2], words[3]),
            float(words[4], words[5]),
        ))
    }
}

impl<I: I2c, D: DelayNs> Co2Sensor for Scd30<I, D> {
    type Error = Scd30Error;

    /// Soft-resets the sensor. The SCD30 keeps its measurement interval and
    /// continuous-measurement state across a reset, so this is safe to use
    /// for recovery while sampling.
    async fn init(&mut self) -> Result<(), Scd30Error> {
        self.write_command(CMD_SOFT_RESET).await?;
        self.delay.delay_ms(SOFT_RESET_TIME_MS).await;
        info!("SCD30: soft reset complete");
        Ok(())
    }

    async fn set_measurement_interval(&mut self, seconds: u16) -> Result<(), Scd30Error> {
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&seconds) {
            return Err(Scd30Error::InvalidArgument);
        }
        self.write_command_with_arg(CMD_SET_MEASUREMENT_INTERVAL, seconds)
            .await?;
        self.interval_secs = seconds;
        info!("SCD30: measurement interval set to {} s", seconds);
        Ok(())
    }

    async fn start_periodic_measurement(
        &mut self,
        ambient_pressure_mbar: u16,
    ) -> Result<(), Scd30Error> {
        if ambient_pressure_mbar != 0
            && !(MIN_PRESSURE_MBAR..=MAX_PRESSURE_MBAR).contains(&ambient_pressure_mbar)
        {
            return Err(Scd30Error::InvalidArgument);
        }
        self.write_command_with_arg(CMD_START_PERIODIC_MEASUREMENT, ambient_pressure_mbar)
            .await?;
        info!("SCD30: periodic measurement started");
        Ok(())
    }

    async fn stop_periodic_measurement(&mut self) -> Result<(), Scd30Error> {
        self.write_command(CMD_STOP_PERIODIC_MEASUREMENT).await?;
        info!("SCD30: periodic measurement stopped");
        Ok(())
    }

    async fn blocking_read_measurement(&mut self) -> Result<SensorReading, Scd30Error> {
        let timeout_ms = self.data_ready_timeout_ms();
        let mut waited_ms = 0;

        while !self.data_ready().await? {
            if waited_ms >= timeout_ms {
                return Err(Scd30Error::Timeout(waited_ms));
            }
            self.delay.delay_ms(DATA_READY_POLL_INTERVAL_MS).await;
            waited_ms += DATA_READY_POLL_INTERVAL_MS;
        }

        debug!("SCD30: data ready after {} ms", waited_ms);
        self.read_measurement().await
    }
}

/// Sensirion CRC-8: polynomial 0x31, init 0xFF, no reflection.
pub(crate) fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
