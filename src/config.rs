//! Configuration management for delta
//!
//! Handles loading and saving configuration from ~/.config/delta/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::steps::Variant;

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Application name for config directory
const APP_NAME: &str = "delta";

/// Port used when neither the CLI nor the config names one
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Unknown config key: {0} (expected default_port, data_dir, bundled_csv or default_variant)")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default port for the web server
    #[serde(default)]
    pub default_port: Option<u16>,

    /// Directory holding the saved session and consent preferences
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Prompt library CSV loaded when the web server starts
    #[serde(default)]
    pub bundled_csv: Option<PathBuf>,

    /// Variant shown when the page URL does not choose one ("A" or "B")
    #[serde(default)]
    pub default_variant: Option<String>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path
    ///
    /// Returns ~/.config/delta/config.toml on Linux/macOS
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Get the config directory path
    ///
    /// Returns ~/.config/delta on Linux/macOS
    pub fn config_dir() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Load configuration from file
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// Creates the config directory if it doesn't exist
    pub fn save(&self) -> ConfigResult<()> {
        let path = Self::config_path()?;
        let dir = Self::config_dir()?;

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Check if any configuration is set
    pub fn is_empty(&self) -> bool {
        self.default_port.is_none()
            && self.data_dir.is_none()
            && self.bundled_csv.is_none()
            && self.default_variant.is_none()
    }

    /// Set a value by key name, as used by `delta config set`.
    ///
    /// An empty value unsets the key.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let value = value.trim();
        let unset = value.is_empty();
        match key {
            "default_port" => {
                self.default_port = if unset {
                    None
                } else {
                    Some(value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?)
                };
            }
            "data_dir" => self.data_dir = (!unset).then(|| PathBuf::from(value)),
            "bundled_csv" => self.bundled_csv = (!unset).then(|| PathBuf::from(value)),
            "default_variant" => {
                self.default_variant = (!unset).then(|| Variant::from_query(Some(value)).to_string())
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Get effective port (from config or default)
    pub fn effective_port(&self, cli_port: u16) -> u16 {
        // CLI argument takes precedence, then config, then default
        if cli_port != DEFAULT_PORT {
            cli_port
        } else {
            self.default_port.unwrap_or(DEFAULT_PORT)
        }
    }

    /// Get effective data directory (CLI flag, then config)
    pub fn effective_data_dir(&self, cli_dir: Option<PathBuf>) -> Option<PathBuf> {
        cli_dir.or_else(|| self.data_dir.clone())
    }

    /// Variant used when the page URL has no `variant` parameter
    pub fn default_variant(&self) -> Variant {
        Variant::from_query(self.default_variant.as_deref())
    }
}

/// Format the configuration for display
pub fn format_config(config: &Config) -> String {
    let mut lines = Vec::new();

    lines.push("Current configuration:".to_string());
    lines.push(String::new());

    if let Some(port) = config.default_port {
        lines.push(format!("  default_port = {}", port));
    } else {
        lines.push(format!("  default_port = (not set, using {})", DEFAULT_PORT));
    }

    if let Some(ref dir) = config.data_dir {
        lines.push(format!("  data_dir = \"{}\"", dir.display()));
    } else {
        lines.push("  data_dir = (not set, using platform data directory)".to_string());
    }

    if let Some(ref path) = config.bundled_csv {
        lines.push(format!("  bundled_csv = \"{}\"", path.display()));
    } else {
        lines.push("  bundled_csv = (not set)".to_string());
    }

    if let Some(ref variant) = config.default_variant {
        lines.push(format!("  default_variant = \"{}\"", variant));
    } else {
        lines.push("  default_variant = (not set, using A)".to_string());
    }

    lines.join("\n")
}
