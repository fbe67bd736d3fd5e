//! The sampling loop
//!
//! Runs in the foreground for the life of the device and is the only writer
//! of the [`SharedSampleSlot`]. Each cycle reads the sensor under the
//! configured [`RetryPolicy`](crate::retry::RetryPolicy):
//!
//! - success: publish the reading and toggle the liveness indicator
//! - all attempts failed: keep the previous reading, re-initialise the sensor
//!   (or, if measurement was never started successfully, run the whole start
//!   sequence again)
//!
//! There is no timer between cycles. The sensor's blocking read waits for the
//! next measurement, which paces the loop at the measurement interval.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::digital::StatefulOutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::SamplingConfig;
use crate::reading::SensorReading;
use crate::retry::Attempted;
use crate::sensors::Co2Sensor;
use crate::slot::SharedSampleSlot;

/// Settle time between configuring the interval and starting measurement.
const START_SETTLE_MS: u32 = 200;

/// Result of one sampling cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Published { reading: SensorReading, attempts: u8 },
    Exhausted { attempts: u8 },
}

/// Running counters since boot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionStats {
    pub cycles: u32,
    pub failed_cycles: u32,
    pub reinit_failures: u32,
}

pub struct Acquisition<'a, S, D, P, M>
where
    M: RawMutex,
{
    sensor: S,
    delay: D,
    indicator: P,
    slot: &'a SharedSampleSlot<M>,
    config: SamplingConfig,
    stats: AcquisitionStats,
    /// Periodic measurement has been started at least once.
    started: bool,
}

impl<'a, S, D, P, M> Acquisition<'a, S, D, P, M>
where
    S: Co2Sensor,
    D: DelayNs,
    P: StatefulOutputPin,
    M: RawMutex,
{
    pub fn new(
        sensor: S,
        delay: D,
        indicator: P,
        slot: &'a SharedSampleSlot<M>,
        config: SamplingConfig,
    ) -> Self {
        Self {
            sensor,
            delay,
            indicator,
            slot,
            config,
            stats: AcquisitionStats::default(),
            started: false,
        }
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    /// Initialise the sensor and start periodic measurement.
    ///
    /// A failure here is not fatal for the device: the caller logs it and
    /// still calls [`run`](Self::run). Until a start succeeds, every
    /// exhausted cycle repeats this sequence.
    pub async fn start(&mut self) -> Result<(), S::Error> {
        self.sensor.init().await?;
        self.sensor
            .set_measurement_interval(self.config.measurement_interval_secs)
            .await?;
        self.delay.delay_ms(START_SETTLE_MS).await;
        self.sensor
            .start_periodic_measurement(self.config.ambient_pressure_mbar)
            .await?;
        self.started = true;

        info!(
            "Sampling every {} s ({} attempts, {} ms apart)",
            self.config.measurement_interval_secs,
            self.config.retry.max_attempts,
            self.config.retry.retry_delay_ms
        );
        Ok(())
    }

    /// Bring a sensor that stopped answering back.
    ///
    /// Once measurement is running a soft reset is enough. Before that the
    /// sensor may be idle, so any half-finished start is stopped and the
    /// full start sequence runs again.
    async fn recover(&mut self) {
        let result = if self.started {
            self.sensor.init().await
        } else {
            if let Err(e) = self.sensor.stop_periodic_measurement().await {
                debug!("Sensor stop before restart failed: {:?}", e);
            }
            self.start().await
        };

        if let Err(e) = result {
            self.stats.reinit_failures = self.stats.reinit_failures.wrapping_add(1);
            warn!("Sensor re-initialisation failed: {:?}", e);
        }
    }

    /// Run one sampling cycle.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let policy = self.config.retry;
        let sensor = &mut self.sensor;
        let result = policy
            .run(&mut self.delay, async || {
                sensor.blocking_read_measurement().await
            })
            .await;

        self.stats.cycles = self.stats.cycles.wrapping_add(1);

        match result {
            Ok(Attempted {
                value: reading,
                attempts,
            }) => {
                self.slot.publish(reading);
                info!(
                    "Sample: CO2={:.2} ppm, T={:.2} C, RH={:.2} %",
                    reading.co2_ppm, reading.temperature_c, reading.humidity_pct
                );
                if !reading.is_valid() {
                    warn!("Sensor returned non-finite values");
                }

                if let Err(e) = self.indicator.toggle() {
                    warn!("Failed to toggle liveness indicator: {:?}", e);
                }

                CycleOutcome::Published { reading, attempts }
            }
            Err(Attempted {
                value: error,
                attempts,
            }) => {
                self.stats.failed_cycles = self.stats.failed_cycles.wrapping_add(1);
                warn!(
                    "Sensor read failed {} times, keeping last reading: {:?}",
                    attempts, error
                );

                self.recover().await;

                CycleOutcome::Exhausted { attempts }
            }
        }
    }

    /// Sample forever.
    pub async fn run(mut self) -> ! {
        loop {
            self.run_cycle().await;
        }
    }
}
