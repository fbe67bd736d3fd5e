//! Application-wide shared state and error types for aircast

use core::fmt::{Debug, Write};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use thiserror_no_std::Error;

use crate::config::ConfigError;
use crate::slot::SharedSampleSlot;

/// The slot shared between the sampling loop and the page server.
///
/// Critical-section locking makes it safe whether the two run as tasks on
/// one executor, on different executors, or on OS threads.
pub type SampleSlot = SharedSampleSlot<CriticalSectionRawMutex>;

/// Errors that stop the device from coming up.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(ConfigError),
    #[error("Wi-Fi bring-up failed: {0}")]
    Wifi(heapless::String<64>),
    #[error("Network stack failed: {0}")]
    Network(heapless::String<64>),
    #[error("Peripheral setup failed: {0}")]
    Hardware(heapless::String<64>),
}

impl AppError {
    pub fn wifi(cause: impl Debug) -> Self {
        Self::Wifi(describe(cause))
    }

    pub fn network(cause: impl Debug) -> Self {
        Self::Network(describe(cause))
    }

    pub fn hardware(cause: impl Debug) -> Self {
        Self::Hardware(describe(cause))
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Debug-format `cause`, cut short if it does not fit.
fn describe<const N: usize>(cause: impl Debug) -> heapless::String<N> {
    let mut s = heapless::String::new();
    if write!(s, "{:?}", cause).is_err() {
        s.clear();
        let _ = s.push_str("<error description too long>");
    }
    s
}
