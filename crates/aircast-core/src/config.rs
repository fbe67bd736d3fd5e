//! Device configuration
//!
//! Everything tunable lives here with the values the device ships with as
//! defaults. Credentials are borrowed so firmware can build the config from
//! compile-time strings without allocating.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::retry::RetryPolicy;

pub const DEFAULT_SSID: &str = "Aircast_CO2_Monitor";
pub const DEFAULT_PASSWORD: &str = "12345678";
pub const DEFAULT_GATEWAY: [u8; 4] = [192, 168, 4, 1];
pub const DEFAULT_HTTP_PORT: u16 = 80;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct DeviceConfig<'a> {
    pub access_point: AccessPointConfig<'a>,
    pub sampling: SamplingConfig,
}

/// The locally hosted wireless network and the page server on it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPointConfig<'a> {
    pub ssid: &'a str,
    /// WPA2 pre-shared key. Empty means an open network.
    pub password: &'a str,
    /// Address of the device itself; clients use it as their gateway
    pub gateway: [u8; 4],
    pub prefix_len: u8,
    pub http_port: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    pub measurement_interval_secs: u16,
    /// 0 disables pressure compensation
    pub ambient_pressure_mbar: u16,
    pub retry: RetryPolicy,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SSID must be 1 to 32 bytes, got {0}")]
    InvalidSsid(usize),
    #[error("password must be empty or 8 to 63 characters, got {0}")]
    InvalidPassword(usize),
    #[error("network prefix length {0} is out of range")]
    InvalidPrefix(u8),
    #[error("measurement interval {0} s is outside 2..=1800")]
    InvalidInterval(u16),
    #[error("ambient pressure {0} mbar is outside 700..=1400")]
    InvalidPressure(u16),
    #[error("retry policy must allow at least one attempt")]
    NoAttempts,
}

impl<'a> DeviceConfig<'a> {
    /// Default configuration with the given network credentials.
    pub const fn new(ssid: &'a str, password: &'a str) -> Self {
        Self {
            access_point: AccessPointConfig {
                ssid,
                password,
                gateway: DEFAULT_GATEWAY,
                prefix_len: 24,
                http_port: DEFAULT_HTTP_PORT,
            },
            sampling: SamplingConfig::DEFAULT,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.access_point.validate()?;
        self.sampling.validate()
    }
}

impl Default for DeviceConfig<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_SSID, DEFAULT_PASSWORD)
    }
}

impl AccessPointConfig<'_> {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() || self.ssid.len() > 32 {
            return Err(ConfigError::InvalidSsid(self.ssid.len()));
        }
        let password_len = self.password.chars().count();
        if password_len != 0 && !(8..=63).contains(&password_len) {
            return Err(ConfigError::InvalidPassword(password_len));
        }
        if !(1..=30).contains(&self.prefix_len) {
            return Err(ConfigError::InvalidPrefix(self.prefix_len));
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl SamplingConfig {
    /// 2 s measurements, no pressure compensation, 3 attempts 10 ms apart.
    pub const DEFAULT: Self = Self {
        measurement_interval_secs: 2,
        ambient_pressure_mbar: 0,
        retry: RetryPolicy::DEFAULT,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=1800).contains(&self.measurement_interval_secs) {
            return Err(ConfigError::InvalidInterval(
                self.measurement_interval_secs,
            ));
        }
        let pressure = self.ambient_pressure_mbar;
        if pressure != 0 && !(700..=1400).contains(&pressure) {
            return Err(ConfigError::InvalidPressure(pressure));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(())
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DeviceConfig::default();

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.access_point.gateway, [192, 168, 4, 1]);
        assert_eq!(config.access_point.http_port, 80);
        assert_eq!(config.sampling.measurement_interval_secs, 2);
        assert_eq!(config.sampling.retry, RetryPolicy::new(3, 10));
    }

    #[test]
    fn test_open_network_is_allowed() {
        let config = DeviceConfig::new("Aircast", "");

        assert_eq!(config.validate(), Ok(()));
        assert!(config.access_point.is_open());
    }

    #[test]
    fn test_short_password_is_rejected() {
        let config = DeviceConfig::new("Aircast", "1234567");
        assert_eq!(config.validate(), Err(ConfigError::InvalidPassword(7)));
    }

    #[test]
    fn test_ssid_length_is_checked() {
        assert_eq!(
            DeviceConfig::new("", "12345678").validate(),
            Err(ConfigError::InvalidSsid(0))
        );
        let long = core::str::from_utf8(&[b'a'; 33]).unwrap();
        assert_eq!(
            DeviceConfig::new(long, "12345678").validate(),
            Err(ConfigError::InvalidSsid(33))
        );
    }

    #[test]
    fn test_sampling_bounds() {
        let mut sampling = SamplingConfig::DEFAULT;
        sampling.measurement_interval_secs = 1;
        assert_eq!(sampling.validate(), Err(ConfigError::InvalidInterval(1)));

        let mut sampling = SamplingConfig::DEFAULT;
        sampling.ambient_pressure_mbar = 1500;
        assert_eq!(sampling.validate(), Err(ConfigError::InvalidPressure(1500)));

        let mut sampling = SamplingConfig::DEFAULT;
        sampling.retry.max_attempts = 0;
        assert_eq!(sampling.validate(), Err(ConfigError::NoAttempts));

        let mut sampling = SamplingConfig::DEFAULT;
        sampling.ambient_pressure_mbar = 1013;
        sampling.retry = RetryPolicy::new(5, 20);
        assert_eq!(sampling.validate(), Ok(()));
    }
}
