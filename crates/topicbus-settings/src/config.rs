//! Configuration for topicbus
//!
//! Settings are stored as TOML or JSON (chosen by file extension) and split
//! into a `bus` section and a `logging` section. Missing sections and fields
//! take their defaults, so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use topicbus_core::{EventBusConfig, MAX_TAP_CAPACITY};

use crate::error::{SettingsError, SettingsResult};

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSettings {
    /// Capacity of the tap broadcast channel, at most `MAX_TAP_CAPACITY`
    pub tap_capacity: usize,
    /// Trace every handler invocation
    pub trace_deliveries: bool,
}

impl Default for BusSettings {
    fn default() -> Self {
        let config = EventBusConfig::default();
        Self {
            tap_capacity: config.tap_capacity,
            trace_deliveries: config.trace_deliveries,
        }
    }
}

impl From<&BusSettings> for EventBusConfig {
    fn from(settings: &BusSettings) -> Self {
        EventBusConfig {
            tap_capacity: settings.tap_capacity,
            trace_deliveries: settings.trace_deliveries,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    #[default]
    Pretty,
    /// Single-line human readable output
    Compact,
    /// One JSON object per line
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level: error, warn, info, debug or trace
    pub level: String,
    /// Extra filter directives, e.g. `topicbus_core=debug`
    pub directives: Vec<String>,
    /// Output format
    pub format: LogFormat,
    /// Include thread ids in each line
    pub with_thread_ids: bool,
    /// Include source line numbers in each line
    pub with_line_number: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: Vec::new(),
            format: LogFormat::Pretty,
            with_thread_ids: true,
            with_line_number: true,
        }
    }
}

impl LoggingSettings {
    /// Parsed default level
    pub fn level(&self) -> SettingsResult<tracing::Level> {
        tracing::Level::from_str(self.level.trim())
            .map_err(|_| SettingsError::invalid("logging.level", format!("unknown level '{}'", self.level)))
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Event bus settings
    pub bus: BusSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

impl Settings {
    /// Create new settings with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings file location: `<config dir>/topicbus/settings.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| SettingsError::ConfigDirectory("no config or home directory".to_string()))?;
        path.push("topicbus");
        path.push("settings.toml");
        Ok(path)
    }

    /// Load settings from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let settings: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        settings.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings from file, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Save settings to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> SettingsResult<()> {
        if self.bus.tap_capacity == 0 {
            return Err(SettingsError::invalid("bus.tap_capacity", "must be > 0"));
        }

        if self.bus.tap_capacity > MAX_TAP_CAPACITY {
            return Err(SettingsError::invalid(
                "bus.tap_capacity",
                format!("must be <= {}", MAX_TAP_CAPACITY),
            ));
        }

        self.logging.level()?;

        if let Some(bad) = self.logging.directives.iter().find(|d| d.trim().is_empty()) {
            return Err(SettingsError::invalid(
                "logging.directives",
                format!("empty directive '{}'", bad),
            ));
        }

        Ok(())
    }

    /// Event bus configuration from these settings
    pub fn bus_config(&self) -> EventBusConfig {
        EventBusConfig::from(&self.bus)
    }
}
