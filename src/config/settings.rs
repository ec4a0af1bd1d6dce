//! Simulator settings

use crate::core::discovery::DevicePattern;
use crate::core::port_loop::Mode;
use crate::core::slot::Slot;
use crate::core::transport::PortSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has the wrong shape
    #[error("Malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Error inside a specific file
    #[error("{}: {source}", .path.display())]
    InFile {
        /// File path
        path: PathBuf,
        /// Cause
        #[source]
        source: Box<ConfigError>,
    },
}

/// `[mode]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModeConfig {
    /// Regular expression selecting serial devices
    pub serial_ports_pattern: String,
    /// Seconds between transmission passes
    pub tx_interval: u64,
    /// `true` collects, `false` transmits
    pub data_collection: bool,
    /// Per-read timeout in seconds
    pub port_timeout: f64,
    /// Directory holding the line logs
    pub log_dir: PathBuf,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            serial_ports_pattern: "com[0-9]".to_string(),
            tx_interval: 10,
            data_collection: true,
            port_timeout: 0.02,
            log_dir: PathBuf::from("."),
        }
    }
}

/// Complete simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Mode and timing
    #[serde(default)]
    pub mode: ModeConfig,
    /// Slot A settings
    #[serde(rename = "port_A", default, skip_serializing_if = "Option::is_none")]
    pub port_a: Option<PortSettings>,
    /// Slot B settings
    #[serde(rename = "port_B", default, skip_serializing_if = "Option::is_none")]
    pub port_b: Option<PortSettings>,
    /// Slot C settings
    #[serde(rename = "port_C", default, skip_serializing_if = "Option::is_none")]
    pub port_c: Option<PortSettings>,
    /// Slot D settings
    #[serde(rename = "port_D", default, skip_serializing_if = "Option::is_none")]
    pub port_d: Option<PortSettings>,
}

/// Used when no configuration file exists: every slot gets 9600 8N1
impl Default for SimConfig {
    fn default() -> Self {
        Self {
            mode: ModeConfig::default(),
            port_a: Some(PortSettings::default()),
            port_b: Some(PortSettings::default()),
            port_c: Some(PortSettings::default()),
            port_d: Some(PortSettings::default()),
        }
    }
}

/// Configuration plus the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Parsed configuration
    pub config: SimConfig,
    /// Source file; `None` when defaults were used
    pub source: Option<PathBuf>,
}

impl SimConfig {
    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the first existing file among
    /// [`super::search_paths`] is used, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
        match explicit {
            Some(path) if !path.is_file() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::load_first(&[path.to_path_buf()]),
            None => Self::load_first(&super::search_paths()),
        }
    }

    fn load_first(candidates: &[PathBuf]) -> Result<LoadedConfig, ConfigError> {
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            return Ok(LoadedConfig {
                config: Self::default(),
                source: None,
            });
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|e| ConfigError::InFile {
            path: path.clone(),
            source: Box::new(e),
        })?;

        Ok(LoadedConfig {
            config,
            source: Some(path.clone()),
        })
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device_pattern()?;

        let timeout = self.mode.port_timeout;
        if !timeout.is_finite() || timeout <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "port_timeout must be a positive number of seconds, got {timeout}"
            )));
        }

        for slot in Slot::ALL {
            if let Some(settings) = self.settings(slot) {
                settings
                    .validate()
                    .map_err(|e| ConfigError::Invalid(format!("{slot}: {e}")))?;
            }
        }

        Ok(())
    }

    /// Mode selected by `data_collection`
    pub fn operating_mode(&self) -> Mode {
        Mode::from_data_collection(self.mode.data_collection)
    }

    /// Compiled device pattern
    pub fn device_pattern(&self) -> Result<DevicePattern, ConfigError> {
        DevicePattern::new(&self.mode.serial_ports_pattern).map_err(|e| {
            ConfigError::Invalid(format!(
                "serial_ports_pattern '{}': {e}",
                self.mode.serial_ports_pattern
            ))
        })
    }

    /// Per-read timeout
    pub fn port_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.mode.port_timeout)
    }

    /// Pause between transmission passes
    pub fn tx_interval(&self) -> Duration {
        Duration::from_secs(self.mode.tx_interval)
    }

    /// Settings configured for `slot`
    pub fn settings(&self, slot: Slot) -> Option<PortSettings> {
        match slot {
            Slot::A => self.port_a,
            Slot::B => self.port_b,
            Slot::C => self.port_c,
            Slot::D => self.port_d,
        }
    }

    /// Settings of all slots in slot order
    pub fn slot_settings(&self) -> [Option<PortSettings>; Slot::COUNT] {
        Slot::ALL.map(|slot| self.settings(slot))
    }
}
