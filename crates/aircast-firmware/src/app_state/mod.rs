//! Firmware-specific application state extensions
//!
//! Re-exports the hardware-independent app state from `aircast_core` and
//! adds ESP32-specific peripheral setup.

mod hardware;

pub use hardware::*;

// Re-export all shared app state types from aircast-core
pub use aircast_core::app_state::*;
