//! Access point credentials, fixed at build time by `build.rs`.

pub const AP_SSID: &str = env!("AIRCAST_AP_SSID");
pub const AP_PASSWORD: &str = env!("AIRCAST_AP_PASSWORD");
