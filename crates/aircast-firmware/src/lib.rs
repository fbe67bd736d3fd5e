//! ESP32-S3 firmware-specific modules for aircast
//!
//! This crate contains the hardware-specific code that cannot compile on
//! desktop targets: ESP32 peripheral initialization, the Wi-Fi access point
//! and its network services, and the embassy-net transport for the page
//! server.

#![no_std]

pub mod app_state;
pub mod http_listener;
pub mod network;
pub mod wifi_secrets;
