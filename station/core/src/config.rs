//! TOML Configuration File Support
//!
//! Station configuration lives in `~/.config/rje-station/station.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [host]
//! address = "mvs.example.org"
//! port = 2553
//!
//! [spool]
//! directory = "/var/spool/rje"
//! file_mode = 432          # 0o660
//! max_name_suffix = 100
//!
//! [console]
//! reader_stream = 1
//! event_capacity = 100
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::router::SpoolPolicy;
use crate::streams::StreamId;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {}: {source}", path.display())]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the effective configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[host]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostToml {
    /// Protocol engine host name or address
    pub address: Option<String>,
    /// Protocol engine port
    pub port: Option<u16>,
}

/// `[spool]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolToml {
    /// Directory receiving spool files
    pub directory: Option<PathBuf>,
    /// Permission bits for new spool files
    pub file_mode: Option<u32>,
    /// Highest collision suffix tried
    pub max_name_suffix: Option<u32>,
}

/// `[console]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleToml {
    /// Card reader used by `load_cards`
    pub reader_stream: Option<u8>,
    /// Capacity of the event and notice channels
    pub event_capacity: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationToml {
    /// Protocol engine endpoint
    pub host: HostToml,
    /// Spool settings
    pub spool: SpoolToml,
    /// Operator console settings
    pub console: ConsoleToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Effective station configuration
#[derive(Clone, Debug)]
pub struct StationConfig {
    /// Protocol engine host
    pub host: String,
    /// Protocol engine port
    pub port: u16,
    /// Spool directory
    pub spool_dir: PathBuf,
    /// Spool file creation settings
    pub spool: SpoolPolicy,
    /// Card reader used by `load_cards`
    pub reader_stream: u8,
    /// Capacity of the event and notice channels
    pub event_capacity: usize,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2553,
            spool_dir: PathBuf::from("./spool"),
            spool: SpoolPolicy::default(),
            reader_stream: 1,
            event_capacity: 100,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl StationConfig {
    /// Create a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the configuration primarily came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Card reader stream as a typed id
    ///
    /// # Errors
    ///
    /// Returns a validation error for stream 0.
    pub fn reader_stream_id(&self) -> Result<StreamId, ConfigError> {
        StreamId::new(self.reader_stream).ok_or_else(|| {
            ConfigError::ValidationError("console.reader_stream must be positive".to_string())
        })
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "host.address must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ConfigError::ValidationError(
                "host.port must be non-zero".to_string(),
            ));
        }
        if self.spool.file_mode > 0o777 {
            return Err(ConfigError::ValidationError(format!(
                "spool.file_mode {:#o} is not a permission mask",
                self.spool.file_mode
            )));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "console.event_capacity must be positive".to_string(),
            ));
        }
        self.reader_stream_id().map(drop)
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Default configuration file path
///
/// `$XDG_CONFIG_HOME/rje-station/station.toml`, typically
/// `~/.config/rje-station/station.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rje-station").join("station.toml"))
}

/// Load configuration from the default path, environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or the
/// result fails validation. A missing default file is not an error.
pub fn load_config() -> Result<StationConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from an optional file path
///
/// A `path` that does not exist falls back to defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or validation fails.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<StationConfig, ConfigError> {
    let mut config = StationConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            apply_file(&mut config, config_path)?;
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file the operator named explicitly
///
/// # Errors
///
/// Unlike [`load_config_from_path`], a missing file is a [`ConfigError::ReadError`].
pub fn load_required_config(path: &Path) -> Result<StationConfig, ConfigError> {
    let mut config = StationConfig::default();
    apply_file(&mut config, path)?;
    apply_env_config(&mut config, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

fn apply_file(config: &mut StationConfig, path: &Path) -> Result<(), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let toml_config: StationToml = toml::from_str(&content)?;
    apply_toml_config(config, &toml_config);
    config.config_file_path = Some(path.to_path_buf());
    config.source = ConfigSource::File;

    tracing::info!(path = %path.display(), "Loaded configuration from file");
    Ok(())
}

/// Apply TOML values over the current configuration
fn apply_toml_config(config: &mut StationConfig, toml: &StationToml) {
    if let Some(ref address) = toml.host.address {
        config.host.clone_from(address);
    }
    if let Some(port) = toml.host.port {
        config.port = port;
    }

    if let Some(ref directory) = toml.spool.directory {
        config.spool_dir.clone_from(directory);
    }
    if let Some(mode) = toml.spool.file_mode {
        config.spool.file_mode = mode;
    }
    if let Some(max) = toml.spool.max_name_suffix {
        config.spool.max_name_suffix = max;
    }

    if let Some(stream) = toml.console.reader_stream {
        config.reader_stream = stream;
    }
    if let Some(capacity) = toml.console.event_capacity {
        config.event_capacity = capacity;
    }
}

/// Apply environment overrides, reading variables through `lookup`
fn apply_env_config(config: &mut StationConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("RJE_HOST") {
        config.host = host;
        config.source = ConfigSource::Env;
    }
    if let Some(port) = lookup("RJE_PORT") {
        match port.parse::<u16>() {
            Ok(port) => {
                config.port = port;
                config.source = ConfigSource::Env;
            }
            Err(e) => warn!(value = %port, error = %e, "Ignoring unparseable RJE_PORT"),
        }
    }
    if let Some(dir) = lookup("RJE_SPOOL_DIR") {
        config.spool_dir = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
    if let Some(stream) = lookup("RJE_READER_STREAM") {
        match stream.parse::<u8>() {
            Ok(stream) => {
                config.reader_stream = stream;
                config.source = ConfigSource::Env;
            }
            Err(e) => {
                warn!(value = %stream, error = %e, "Ignoring unparseable RJE_READER_STREAM");
            }
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// CLI overrides applied after loading
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Host override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Spool directory override
    pub spool_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create an empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set host override
    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = Some(host);
        self
    }

    /// Set port override
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set spool directory override
    #[must_use]
    pub fn with_spool_dir(mut self, dir: PathBuf) -> Self {
        self.spool_dir = Some(dir);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut StationConfig) {
        if self.host.is_some() || self.port.is_some() || self.spool_dir.is_some() {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref host) = self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref dir) = self.spool_dir {
            config.spool_dir.clone_from(dir);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = StationConfig::default();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 2553);
        assert_eq!(config.spool_dir, PathBuf::from("./spool"));
        assert_eq!(config.spool.file_mode, 0o660);
        assert_eq!(config.reader_stream, 1);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("rje-station"));
            assert!(p.to_string_lossy().ends_with("station.toml"));
        }
    }

    #[test]
    fn test_parse_full_toml() {
        let file = write_toml(
            r#"
[host]
address = "mvs.example.org"
port = 3270

[spool]
directory = "/var/spool/rje"
file_mode = 384
max_name_suffix = 9

[console]
reader_stream = 2
event_capacity = 32
"#,
        );

        let config = load_required_config(file.path()).unwrap();

        // Host and port can be overridden by RJE_* variables; check the rest
        assert_eq!(config.spool.file_mode, 0o600);
        assert_eq!(config.spool.max_name_suffix, 9);
        assert_eq!(config.event_capacity, 32);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut config = StationConfig::default();
        let toml: StationToml = toml::from_str("[host]\nport = 4000\n").unwrap();
        apply_toml_config(&mut config, &toml);

        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.spool_dir, PathBuf::from("./spool"));
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_toml("[host\nport = \"not a number\"\n");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/rje/station.toml"))).unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_missing_required_file_is_error() {
        let result = load_required_config(Path::new("/nonexistent/rje/station.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = StationConfig::default();
        let toml: StationToml =
            toml::from_str("[host]\naddress = \"file-host\"\nport = 1000\n").unwrap();
        apply_toml_config(&mut config, &toml);
        config.set_source(ConfigSource::File);

        let env: HashMap<&str, &str> = [("RJE_HOST", "env-host"), ("RJE_PORT", "2000")].into();
        apply_env_config(&mut config, |name| env.get(name).map(ToString::to_string));

        assert_eq!(config.host, "env-host");
        assert_eq!(config.port, 2000);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_unparseable_env_ignored() {
        let mut config = StationConfig::default();
        apply_env_config(&mut config, |name| {
            (name == "RJE_PORT").then(|| "not-a-port".to_string())
        });

        assert_eq!(config.port, 2553);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_out_of_range_reader_stream_ignored() {
        let mut config = StationConfig::default();
        apply_env_config(&mut config, |name| match name {
            "RJE_READER_STREAM" => Some("300".to_string()),
            "RJE_PORT" => Some("-1".to_string()),
            "RJE_HOST" => Some("mvs.example.org".to_string()),
            _ => None,
        });

        // The parseable variable still applies
        assert_eq!(config.host, "mvs.example.org");
        assert_eq!(config.port, 2553);
        assert_eq!(config.reader_stream, StationConfig::default().reader_stream);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = StationConfig::default();
        config.host = "env-host".to_string();
        config.set_source(ConfigSource::Env);

        ConfigOverrides::new()
            .with_host("cli-host".to_string())
            .with_spool_dir(PathBuf::from("/tmp/spool"))
            .apply(&mut config);

        assert_eq!(config.host, "cli-host");
        assert_eq!(config.spool_dir, PathBuf::from("/tmp/spool"));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_no_change() {
        let mut config = StationConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_validation() {
        let mut config = StationConfig::default();
        config.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = StationConfig::default();
        config.reader_stream = 0;
        assert!(config.validate().is_err());

        let mut config = StationConfig::default();
        config.spool.file_mode = 0o4777;
        assert!(config.validate().is_err());

        let mut config = StationConfig::default();
        config.event_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::Cli), "CLI");
        assert_eq!(format!("{}", ConfigSource::Env), "environment");
        assert_eq!(format!("{}", ConfigSource::File), "config file");
        assert_eq!(format!("{}", ConfigSource::Default), "default");
    }
}
