//! Runtime configuration
//!
//! Secrets are never compiled into the core. A board either builds a
//! [`Config`] directly or hands over a provisioning blob (settings
//! partition, SD card file) for [`Config::parse`]:
//!
//! ```text
//! # noisemeter provisioning
//! network_name = civic-lab
//! network_passphrase = hunter22
//! api_key = BBFF-0123456789
//! reporting_interval_secs = 59
//! max_connect_attempts = 10
//! ```
//!
//! Network credentials entered through the device's setup page live in a
//! checksummed block instead; see [`Config::apply_stored`].

use core::str::FromStr;

use heapless::String;

use crate::error::{ConfigError, StorageError};
use crate::storage::{CredentialBlock, Entry};

pub const NETWORK_NAME_CAPACITY: usize = 32;
pub const PASSPHRASE_CAPACITY: usize = 64;
pub const API_KEY_CAPACITY: usize = 64;
pub const URL_CAPACITY: usize = 128;

/// Token endpoint of the telemetry service
pub const DEFAULT_AUTH_URL: &str = "https://industrial.api.ubidots.com/api/v1.6/auth/token";

/// Publish endpoint for the `noisemeter` device label
pub const DEFAULT_PUBLISH_URL: &str =
    "https://industrial.api.ubidots.com/api/v1.6/devices/noisemeter/";

/// Offset from a round minute so cycles do not line up with minute-aligned
/// jobs on the server side
pub const DEFAULT_REPORTING_INTERVAL_SECS: u32 = 59;

/// Telemetry node configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub network_name: String<NETWORK_NAME_CAPACITY>,
    pub network_passphrase: String<PASSPHRASE_CAPACITY>,
    pub api_key: String<API_KEY_CAPACITY>,
    /// Sleep between reporting cycles
    pub reporting_interval_secs: u32,
    /// Link status polls before giving up on the network
    pub max_connect_attempts: u32,
    pub connect_poll_interval_ms: u32,
    /// Averaging window the sensor is expected to be set to
    pub expected_averaging_window_ms: u16,
    /// Reprogram the sensor when its window differs (otherwise only warn)
    pub enforce_averaging_window: bool,
    pub auth_url: String<URL_CAPACITY>,
    pub publish_url: String<URL_CAPACITY>,
    /// Added to UTC when rendering log timestamps
    pub utc_offset_secs: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_name: String::new(),
            network_passphrase: String::new(),
            api_key: String::new(),
            reporting_interval_secs: DEFAULT_REPORTING_INTERVAL_SECS,
            max_connect_attempts: 10,
            connect_poll_interval_ms: 1000,
            expected_averaging_window_ms: 1000,
            enforce_averaging_window: false,
            auth_url: String::try_from(DEFAULT_AUTH_URL).unwrap_or_default(),
            publish_url: String::try_from(DEFAULT_PUBLISH_URL).unwrap_or_default(),
            utc_offset_secs: 0,
        }
    }
}

impl Config {
    /// Default settings with the three required secrets
    pub fn new(network_name: &str, passphrase: &str, api_key: &str) -> Result<Self, ConfigError> {
        let too_long = ConfigError::TooLong { line: 0 };
        Ok(Self {
            network_name: String::try_from(network_name).map_err(|_| too_long)?,
            network_passphrase: String::try_from(passphrase).map_err(|_| too_long)?,
            api_key: String::try_from(api_key).map_err(|_| too_long)?,
            ..Self::default()
        })
    }

    /// Parse a provisioning blob of `key = value` lines
    ///
    /// Blank lines and lines starting with `#` are skipped. Keys not present
    /// keep their defaults. The result is not validated; see [`Config::validate`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = trimmed
                .split_once('=')
                .ok_or(ConfigError::MissingSeparator { line })?;
            config.set(key.trim(), value.trim(), line)?;
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str, line: usize) -> Result<(), ConfigError> {
        match key {
            "network_name" => self.network_name = text(value, line)?,
            "network_passphrase" => self.network_passphrase = text(value, line)?,
            "api_key" => self.api_key = text(value, line)?,
            "reporting_interval_secs" => self.reporting_interval_secs = parsed(value, line)?,
            "max_connect_attempts" => self.max_connect_attempts = parsed(value, line)?,
            "connect_poll_interval_ms" => self.connect_poll_interval_ms = parsed(value, line)?,
            "expected_averaging_window_ms" => {
                self.expected_averaging_window_ms = parsed(value, line)?
            }
            "enforce_averaging_window" => self.enforce_averaging_window = parsed(value, line)?,
            "auth_url" => self.auth_url = text(value, line)?,
            "publish_url" => self.publish_url = text(value, line)?,
            "utc_offset_secs" => self.utc_offset_secs = parsed(value, line)?,
            _ => return Err(ConfigError::UnknownKey { line }),
        }
        Ok(())
    }

    /// Take the network credentials from a stored settings block
    ///
    /// The block must pass its checksum; nothing is changed otherwise.
    pub fn apply_stored(&mut self, block: &CredentialBlock) -> Result<(), ConfigError> {
        block.verify()?;
        let name = block.get(Entry::NetworkName)?;
        let passphrase = block.get(Entry::Passphrase)?;

        self.network_name = String::try_from(name.as_str())
            .map_err(|_| StorageError::TooLong(Entry::NetworkName))?;
        self.network_passphrase = String::try_from(passphrase.as_str())
            .map_err(|_| StorageError::TooLong(Entry::Passphrase))?;
        Ok(())
    }

    /// Check the settings the telemetry loop cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_name.is_empty() {
            return Err(ConfigError::Empty("network_name"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Empty("api_key"));
        }
        if self.auth_url.is_empty() {
            return Err(ConfigError::Empty("auth_url"));
        }
        if self.publish_url.is_empty() {
            return Err(ConfigError::Empty("publish_url"));
        }
        if self.reporting_interval_secs == 0 {
            return Err(ConfigError::Zero("reporting_interval_secs"));
        }
        if self.max_connect_attempts == 0 {
            return Err(ConfigError::Zero("max_connect_attempts"));
        }
        Ok(())
    }

    /// Reporting interval as a delay in milliseconds
    pub fn reporting_interval_ms(&self) -> u32 {
        self.reporting_interval_secs.saturating_mul(1000)
    }
}

fn text<const N: usize>(value: &str, line: usize) -> Result<String<N>, ConfigError> {
    String::try_from(value).map_err(|_| ConfigError::TooLong { line })
}

fn parsed<T: FromStr>(value: &str, line: usize) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue { line })
}
