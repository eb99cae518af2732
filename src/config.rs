//! Configuration file management for tlsdays.
//!
//! Settings are layered with clear precedence rules:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (specified with --config)
//! 3. Command-line arguments (highest priority)
//!
//! # Example Configuration File
//!
//! ```toml
//! port = 8443
//! timeout = 10
//! debug = false
//! output = "text"
//! log_level = "info"
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connector::{ConnectOptions, DEFAULT_TIMEOUT};
use crate::report::OutputFormat;
use crate::target::DEFAULT_PORT;

/// Main configuration structure.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Port used when the host argument does not name one
    pub port: Option<u16>,
    /// Connect and read/write timeout in seconds
    pub timeout: Option<u64>,
    /// Print certificate details along with the day count
    pub debug: Option<bool>,
    /// Output format: text, json
    pub output: Option<String>,
    /// Log filter used when RUST_LOG is unset
    pub log_level: Option<String>,
}

/// Fully resolved settings after merging every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub timeout: Duration,
    pub debug: bool,
    pub output: OutputFormat,
    pub log_level: String,
}

impl Settings {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            timeout: self.timeout,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML or unknown keys
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The built-in defaults.
    pub fn defaults() -> Self {
        Config {
            port: Some(DEFAULT_PORT),
            timeout: Some(DEFAULT_TIMEOUT),
            debug: Some(false),
            output: Some(OutputFormat::Text.to_string()),
            log_level: Some("warn".to_string()),
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        self
    }

    /// Checks values and fills gaps from the defaults.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let merged = Config::defaults().merge_with(self);

        let timeout = merged.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout == 0 {
            return Err(ConfigError::Validation(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        let port = merged.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ConfigError::Validation("port must not be 0".to_string()));
        }

        let output = match merged.output {
            Some(raw) => OutputFormat::from_str(&raw).map_err(|_| {
                ConfigError::Validation(format!(
                    "unknown output format '{}', expected text or json",
                    raw
                ))
            })?,
            None => OutputFormat::default(),
        };

        Ok(Settings {
            port,
            timeout: Duration::from_secs(timeout),
            debug: merged.debug.unwrap_or(false),
            output,
            log_level: merged.log_level.unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            port: Some(443),
            timeout: Some(10),
            debug: Some(false),
            output: Some("text".to_string()),
            log_level: Some("info".to_string()),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found, permission denied, etc.
    #[error("IO Error: {0}")]
    Io(String),
    /// Invalid syntax, type mismatch, unknown key
    #[error("Parse Error: {0}")]
    Parse(String),
    /// A value is out of range
    #[error("Validation Error: {0}")]
    Validation(String),
}
