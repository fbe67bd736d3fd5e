//! Desktop simulator for the aircast CO2 monitor.
//!
//! Runs the real sampling loop against a synthetic sensor on one thread and
//! the real page server on a plain TCP socket on another, sharing one slot
//! exactly like the firmware does. Point a browser at
//! `http://127.0.0.1:8080/` to watch the page refresh.
//!
//! The synthetic sensor fails now and then: single failed reads that the
//! retry policy absorbs, and occasional bursts long enough to exhaust a whole
//! cycle so the stale-value path can be observed.
//!
//! # Environment
//!
//! | Variable           | Default | Meaning                 |
//! |--------------------|---------|-------------------------|
//! | `AIRCAST_SIM_PORT` | 8080    | TCP port of the page    |
//! | `RUST_LOG`         | unset   | env_logger filter       |

mod transport;

use std::convert::Infallible;
use std::thread;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};

use aircast_core::acquisition::Acquisition;
use aircast_core::app_state::SampleSlot;
use aircast_core::config::SamplingConfig;
use aircast_core::reading::SensorReading;
use aircast_core::sensors::Co2Sensor;
use aircast_core::server::Server;

use transport::StdAcceptor;

const DEFAULT_PORT: u16 = 8080;

/// Every Nth read fails once.
const TRANSIENT_FAULT_PERIOD: u64 = 11;
/// Every Nth read starts a burst long enough to exhaust a cycle.
const FAULT_BURST_PERIOD: u64 = 40;

static SLOT: SampleSlot = SampleSlot::new();

// ---------------------------------------------------------------------------
// Synthetic hardware
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum SimulatedFault {
    BusCollision,
    Unresponsive,
}

/// Generates slowly varying readings and paces reads like the real sensor.
struct SimulatedSensor {
    started: Instant,
    interval: Duration,
    reads: u64,
    burst_remaining: u8,
}

impl SimulatedSensor {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            interval: Duration::from_secs(2),
            reads: 0,
            burst_remaining: 0,
        }
    }

    fn sample(&self) -> SensorReading {
        let t = self.started.elapsed().as_secs_f64();

        // CO₂: 400–800 ppm with a longer cycle
        let co2 = 600.0 + 200.0 * (t / 300.0).sin() + 30.0 * (t / 41.0).cos();
        // Temperature: 20–26 °C sinusoidal with slow drift
        let temperature = 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();
        // Humidity: 40–60 % with different period
        let humidity = 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos();

        SensorReading::new(co2 as f32, temperature as f32, humidity as f32)
    }
}

impl Co2Sensor for SimulatedSensor {
    type Error = SimulatedFault;

    async fn init(&mut self) -> Result<(), SimulatedFault> {
        info!("Simulated sensor initialised");
        self.burst_remaining = 0;
        Ok(())
    }

    async fn set_measurement_interval(&mut self, seconds: u16) -> Result<(), SimulatedFault> {
        self.interval = Duration::from_secs(u64::from(seconds));
        Ok(())
    }

    async fn start_periodic_measurement(&mut self, _pressure: u16) -> Result<(), SimulatedFault> {
        Ok(())
    }

    async fn stop_periodic_measurement(&mut self) -> Result<(), SimulatedFault> {
        Ok(())
    }

    async fn blocking_read_measurement(&mut self) -> Result<SensorReading, SimulatedFault> {
        self.reads += 1;

        if self.reads % FAULT_BURST_PERIOD == 0 {
            self.burst_remaining = 3;
        }
        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return Err(SimulatedFault::Unresponsive);
        }
        if self.reads % TRANSIENT_FAULT_PERIOD == 0 {
            return Err(SimulatedFault::BusCollision);
        }

        thread::sleep(self.interval);
        Ok(self.sample())
    }
}

/// Sleeps the calling thread.
struct ThreadDelay;

impl DelayNs for ThreadDelay {
    async fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Liveness indicator that logs instead of lighting up.
#[derive(Default)]
struct ConsoleLed {
    on: bool,
}

impl ErrorType for ConsoleLed {
    type Error = Infallible;
}

impl OutputPin for ConsoleLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.on = false;
        debug!("LED off");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.on = true;
        debug!("LED on");
        Ok(())
    }
}

impl StatefulOutputPin for ConsoleLed {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.on)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.on)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn port_from_env() -> u16 {
    match std::env::var("AIRCAST_SIM_PORT") {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid AIRCAST_SIM_PORT={:?}", value);
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}

fn main() {
    env_logger::init();
    info!("Starting aircast simulator");

    let port = port_from_env();
    let acceptor = match StdAcceptor::bind(port) {
        Ok(acceptor) => acceptor,
        Err(e) => {
            error!("Failed to bind page server on port {}: {}", port, e);
            std::process::exit(1);
        }
    };
    info!("Serving on http://127.0.0.1:{}/", port);

    let sampling = SamplingConfig::DEFAULT;
    let spawned = thread::Builder::new()
        .name("acquisition".into())
        .spawn(move || {
            let mut acquisition = Acquisition::new(
                SimulatedSensor::new(),
                ThreadDelay,
                ConsoleLed::default(),
                &SLOT,
                sampling,
            );
            if let Err(e) = block_on(acquisition.start()) {
                warn!("Simulated sensor start failed: {:?}", e);
            }
            block_on(acquisition.run());
        });
    if let Err(e) = spawned {
        error!("Failed to start acquisition thread: {}", e);
        std::process::exit(1);
    }

    block_on(Server::new(acceptor, ThreadDelay, &SLOT).run());
}
