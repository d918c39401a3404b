//! Configuration file support for hvcube.
//!
//! This module provides serialization and deserialization of converter and
//! logging settings so callers can keep them in a JSON file alongside their
//! data.

use serde::{Deserialize, Serialize};

use crate::convert::ConvertOptions;

/// Verbosity of this crate's log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Settings that can be exported and imported as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Conversion settings
    #[serde(default)]
    pub converter: ConverterSettings,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Converter section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterSettings {
    /// Samples gathered per sequential write
    #[serde(default = "default_chunk_elements")]
    pub chunk_elements: usize,
}

fn default_chunk_elements() -> usize {
    ConvertOptions::DEFAULT_CHUNK_ELEMENTS
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            chunk_elements: default_chunk_elements(),
        }
    }
}

impl CubeConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            converter: ConverterSettings::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Cap the global `log` level at the configured verbosity.
    ///
    /// The host still installs the logger; this only sets the maximum level
    /// records are emitted at.
    pub fn apply_log_level(&self) {
        log::set_max_level(self.log_level.to_level_filter());
        log::debug!("Log level set to {:?}", self.log_level);
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "hvcube-config.json"
    }

    /// Get the default config file path.
    /// Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("hvcube").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("hvcube")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CubeConfig::new();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(
            config.converter.chunk_elements,
            ConvertOptions::DEFAULT_CHUNK_ELEMENTS
        );
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = CubeConfig::from_json(r#"{"version": 1}"#).unwrap();
        assert_eq!(config, CubeConfig::default());

        let config =
            CubeConfig::from_json(r#"{"version": 1, "converter": {}, "log_level": "trace"}"#)
                .unwrap();
        assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Trace);
        assert_eq!(
            config.converter.chunk_elements,
            ConvertOptions::DEFAULT_CHUNK_ELEMENTS
        );
    }

    #[test]
    fn test_version_too_new() {
        let err = CubeConfig::from_json(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::VersionTooNew {
                file_version: 99,
                supported_version: CONFIG_VERSION
            }
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CubeConfig::default_filename());

        let mut config = CubeConfig::new();
        config.converter.chunk_elements = 512;
        config.log_level = LogLevel::Debug;
        config.save(&path).unwrap();

        assert_eq!(CubeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_log_levels_ordered() {
        let filters: Vec<_> = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
        .iter()
        .map(LogLevel::to_level_filter)
        .collect();
        assert!(filters.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_apply_log_level_sets_max_level() {
        crate::tests::fixtures::init_logging();
        let previous = log::max_level();
        let config = CubeConfig::from_json(r#"{"version": 1, "log_level": "warn"}"#).unwrap();

        config.apply_log_level();
        assert_eq!(log::max_level(), log::LevelFilter::Warn);
        log::set_max_level(previous);
    }
}
