//! Configuration management for Cryoflow.
//!
//! This module provides the configuration system that supports:
//! - Loading from YAML files
//! - Environment variable overrides
//! - Validation of all settings
//! - Plugin selections, dispatch checking, metadata extraction and logging

use crate::error::{ConfigError, Result};
use crate::types::{Category, PluginSelection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use cryoflow_core::config::AppConfig;
///
/// let config = AppConfig::from_file("cryoflow.yaml").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application-wide settings
    #[serde(default)]
    pub app: ApplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Contract-checked dispatch settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Plugin selections, at most one per category
    #[serde(default)]
    pub plugins: Vec<PluginSelection>,

    /// Metadata extraction settings
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate, layering
    /// `CRYOFLOW__*` environment variables over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("CRYOFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// Checks for:
    /// - A parseable log level
    /// - A non-zero frame count timeout
    /// - Well-formed plugin selections, at most one per category
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<()> {
        self.logging.parse_level()?;
        self.dispatch.validate()?;

        let mut seen = std::collections::HashSet::new();
        for selection in &self.plugins {
            selection.validate()?;
            if !seen.insert(selection.category) {
                return Err(ConfigError::DuplicateSelection {
                    category: selection.category.to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Returns the plugin selection configured for a category.
    pub fn selection(&self, category: Category) -> Option<&PluginSelection> {
        self.plugins.iter().find(|s| s.category == category)
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Number of blocking workers used when scanning (0 = number of CPUs)
    #[serde(default)]
    pub worker_threads: usize,
}

fn default_app_name() -> String {
    "cryoflow".to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            worker_threads: 0,
        }
    }
}

/// Settings for the contract-checked dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Whether results are checked against the declared contract shape.
    /// Defaults to on in debug builds and off in release builds.
    #[serde(default)]
    pub check_shapes: Option<bool>,

    /// Upper bound for a single frame-count probe in seconds
    #[serde(default = "default_frame_count_timeout")]
    pub frame_count_timeout_secs: u64,
}

fn default_frame_count_timeout() -> u64 {
    30
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            check_shapes: None,
            frame_count_timeout_secs: default_frame_count_timeout(),
        }
    }
}

impl DispatchConfig {
    /// Returns whether result shapes must be checked.
    pub fn shape_checks_enabled(&self) -> bool {
        self.check_shapes.unwrap_or(cfg!(debug_assertions))
    }

    /// Returns the frame-count timeout as a Duration.
    pub fn frame_count_timeout(&self) -> Duration {
        Duration::from_secs(self.frame_count_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.frame_count_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "dispatch.frame_count_timeout_secs",
                "timeout cannot be 0",
            )
            .into());
        }
        Ok(())
    }
}

/// Metadata extraction settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Optional YAML file replacing the built-in level specification
    #[serde(default)]
    pub level_spec: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Whether to include file/line info
    #[serde(default)]
    pub file_line: bool,

    /// Per-module log levels
    #[serde(default)]
    pub module_levels: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
            file_line: false,
            module_levels: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }

    /// Builds an `EnvFilter`-compatible directive string.
    pub fn filter_directives(&self) -> String {
        let mut directives = vec![self.level.clone()];
        let mut modules: Vec<_> = self.module_levels.iter().collect();
        modules.sort();
        for (module, level) in modules {
            directives.push(format!("{}={}", module, level));
        }
        directives.join(",")
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}
