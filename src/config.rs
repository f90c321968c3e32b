//! # Configuration Management
//!
//! Centralized configuration for the login server.
//!
//! This module provides structured configuration for the UDP login service,
//! the REST lookup service, the credential store and logging.
//!
//! ## Configuration Sources
//! - Direct instantiation with defaults
//! - TOML files via `from_file()`
//! - Environment overrides via `apply_env()` (`STNP_LOGIN_*`)
//! - Command line flags, applied last by the binary
//!
//! ## Conventions
//! - An empty `db_file` keeps the credential store in memory only
//! - An empty `log_file` sends logs to stderr

use crate::error::{LoginError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Default UDP port of the login service
pub const DEFAULT_UDP_PORT: u16 = 0x1234;

/// Default port of the REST lookup service
pub const DEFAULT_REST_PORT: u16 = 8124;

/// Default credential store location
pub const DEFAULT_DB_FILE: &str = "/var/lib/stb/login_server_db.json";

/// Default log destination
pub const DEFAULT_LOG_FILE: &str = "/var/log/stb/login_server.log";

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoginConfig {
    /// UDP login service configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// REST lookup service configuration
    #[serde(default)]
    pub rest: RestConfig,

    /// Credential store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LoginConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| LoginError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| LoginError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| LoginError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Override fields from `STNP_LOGIN_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("STNP_LOGIN_UDP_ADDRESS") {
            self.server.address = addr;
        }

        if let Ok(addr) = std::env::var("STNP_LOGIN_REST_ADDRESS") {
            self.rest.address = addr;
        }

        if let Ok(list) = std::env::var("STNP_LOGIN_REST_ALLOW_LIST") {
            self.rest.allow_list = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Ok(path) = std::env::var("STNP_LOGIN_DB_FILE") {
            self.store.db_file = path;
        }

        if let Ok(path) = std::env::var("STNP_LOGIN_LOG_FILE") {
            self.logging.log_file = path;
        }

        if let Ok(level) = std::env::var("STNP_LOGIN_LOG_LEVEL") {
            self.logging.log_level = level.parse()?;
        }

        Ok(())
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LoginError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| LoginError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.rest.validate());
        errors.extend(self.store.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LoginError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// UDP login service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:4660")
    pub address: String,

    /// Maximum number of replies waiting for the socket
    pub backpressure_limit: usize,

    /// Time granted to in-flight requests on shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: format!("0.0.0.0:{DEFAULT_UDP_PORT}"),
            backpressure_limit: 1024,
            shutdown_timeout: timeout::SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Validate UDP service configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:4660')",
                self.address
            ));
        }

        if self.backpressure_limit == 0 {
            errors.push("Backpressure limit must be greater than 0".to_string());
        } else if self.backpressure_limit > 1_000_000 {
            errors.push(format!(
                "Backpressure limit too large: {} (max recommended: 1,000,000)",
                self.backpressure_limit
            ));
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// REST lookup service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestConfig {
    /// Whether to serve the lookup API at all
    pub enabled: bool,

    /// Listen address (e.g., "0.0.0.0:8124")
    pub address: String,

    /// Peer IP addresses allowed to query
    pub allow_list: Vec<String>,

    /// Number of HTTP worker threads
    pub workers: usize,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: format!("0.0.0.0:{DEFAULT_REST_PORT}"),
            allow_list: vec![String::from("127.0.0.1"), String::from("::1")],
            workers: 2,
        }
    }
}

impl RestConfig {
    /// Validate REST service configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.enabled {
            return errors;
        }

        if self.address.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid REST address format: '{}' (expected format: '0.0.0.0:8124')",
                self.address
            ));
        }

        for entry in &self.allow_list {
            if entry.parse::<IpAddr>().is_err() {
                errors.push(format!("Invalid allow-list address: '{entry}'"));
            }
        }

        if self.workers == 0 {
            errors.push("REST workers must be greater than 0".to_string());
        } else if self.workers > 64 {
            errors.push(format!("Too many REST workers: {} (maximum: 64)", self.workers));
        }

        errors
    }

    /// Parsed allow-list; invalid entries are skipped (see `validate`).
    pub fn allowed_addrs(&self) -> Vec<IpAddr> {
        self.allow_list
            .iter()
            .filter_map(|entry| entry.parse().ok())
            .collect()
    }
}

/// Credential store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Path of the JSON document, empty for no persistence
    pub db_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_file: String::from(DEFAULT_DB_FILE),
        }
    }
}

impl StoreConfig {
    pub fn db_path(&self) -> Option<&Path> {
        if self.db_file.is_empty() {
            None
        } else {
            Some(Path::new(&self.db_file))
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(parent) = self.db_path().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                errors.push(format!(
                    "Database directory does not exist: {}",
                    parent.display()
                ));
            }
        }
        errors
    }
}

/// Minimal severity of emitted logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Matching `tracing` level; `critical` has no own level and maps to ERROR.
    pub fn as_tracing(self) -> Level {
        match self {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warning => Level::WARN,
            LogLevel::Error | LogLevel::Critical => Level::ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoginError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(LoginError::ConfigError(format!(
                "invalid log level '{other}' (expected debug, info, warning, error or critical)"
            ))),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Minimal severity
    pub log_level: LogLevel,

    /// Log file, empty for stderr
    pub log_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_file: String::from(DEFAULT_LOG_FILE),
        }
    }
}

impl LoggingConfig {
    pub fn log_path(&self) -> Option<&Path> {
        if self.log_file.is_empty() {
            None
        } else {
            Some(Path::new(&self.log_file))
        }
    }

    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(parent) = self.log_path().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                errors.push(format!(
                    "Log file directory does not exist: {}",
                    parent.display()
                ));
            }
        }
        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
