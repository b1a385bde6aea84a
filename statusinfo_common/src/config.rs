//! Configuration loading traits and types.
//!
//! Static configuration is read once before the reactor starts and never
//! changes afterwards. Every field has a default matching a typical laptop
//! setup, so running without a configuration file is the common case.
//!
//! # Usage
//!
//! ```rust,no_run
//! use statusinfo_common::config::{ConfigError, ConfigLoader, StatusConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = StatusConfig::load(Path::new("statusinfo.toml"))?;
//!     config.validate()?;
//!     println!("Battery: {}", config.battery_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{NOTIFY_TIMEOUT_MS, STATUS_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Name usable as a `tracing` filter directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Static configuration of the status line.
///
/// # TOML Example
///
/// ```toml
/// log_level = "debug"
/// status_timeout_ms = 5000
/// battery_name = "BAT0"
/// adaptor_name = "ADP1"
/// mixer_controls = ["Master"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Time between periodic refreshes (ms).
    pub status_timeout_ms: u64,

    /// Time a notification stays visible before the next refresh (ms).
    pub notify_timeout_ms: u64,

    /// Mount point of sysfs.
    pub sysfs_root: PathBuf,

    /// Zone path prefix below `sysfs_root`; the zone number is appended.
    pub thermal_zone_prefix: String,

    /// Sensor names accepted as the CPU temperature source, in preference order.
    pub thermal_names: Vec<String>,

    /// Temperature input file inside the matched zone.
    pub temp_input: String,

    /// Power supply class directory below `sysfs_root`.
    pub power_supply_dir: PathBuf,

    /// Battery reported by the periodic composer.
    pub battery_name: String,

    /// AC adaptor reported on plug/unplug events.
    pub adaptor_name: String,

    /// ALSA device whose mixer is watched ("default", "hw:0", ...).
    pub alsa_device: String,

    /// Simple mixer controls watched for volume changes.
    pub mixer_controls: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            status_timeout_ms: STATUS_TIMEOUT_MS,
            notify_timeout_ms: NOTIFY_TIMEOUT_MS,
            sysfs_root: PathBuf::from("/sys"),
            thermal_zone_prefix: "class/hwmon/hwmon".to_string(),
            thermal_names: ["cpu_thermal", "acpitz", "k10temp", "amdgpu"]
                .map(String::from)
                .to_vec(),
            temp_input: "temp1_input".to_string(),
            power_supply_dir: PathBuf::from("class/power_supply"),
            battery_name: "BAT1".to_string(),
            adaptor_name: "AC".to_string(),
            alsa_device: "default".to_string(),
            mixer_controls: ["Master", "PCM", "Headphone", "Speaker"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl StatusConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - either timeout is zero
    /// - `battery_name` is empty
    /// - `mixer_controls` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.status_timeout_ms == 0 || self.notify_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.battery_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "battery_name cannot be empty".to_string(),
            ));
        }
        if self.mixer_controls.is_empty() {
            return Err(ConfigError::ValidationError(
                "mixer_controls needs at least one control".to_string(),
            ));
        }
        Ok(())
    }

    /// Long (periodic) reactor timeout.
    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    /// Short (post-notification) reactor timeout.
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    /// `<sysfs>/<power_supply_dir>/<battery>/<file>`.
    pub fn battery_path(&self, file: &str) -> PathBuf {
        self.sysfs_root
            .join(&self.power_supply_dir)
            .join(&self.battery_name)
            .join(file)
    }

    /// `<sysfs>/<thermal_zone_prefix><zone>`.
    pub fn thermal_zone_dir(&self, zone: usize) -> PathBuf {
        self.sysfs_root
            .join(format!("{}{}", self.thermal_zone_prefix, zone))
    }

    /// Load from `path` if given, defaults otherwise. The result is validated.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
