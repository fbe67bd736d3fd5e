//! Hardware-independent core library for aircast
//!
//! This crate contains all platform-agnostic logic for the aircast CO2
//! monitor: the sensor driver, the single-slot hand-off between the sampling
//! loop and the page server, the retry policy, page rendering, the
//! request handler and listener loop, and the captive DNS responder.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests).

#![no_std]

pub mod acquisition;
pub mod app_state;
pub mod async_i2c_bus;
pub mod captive_dns;
pub mod config;
pub mod http;
pub mod page;
pub mod reading;
pub mod retry;
pub mod sensors;
pub mod server;
pub mod slot;

#[cfg(test)]
mod test_support;
