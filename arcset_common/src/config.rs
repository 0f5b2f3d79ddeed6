//! Configuration loading traits and types.
//!
//! Both binaries accept an optional `--config <file>` TOML file. Every
//! field has a default, so an absent file yields the stock ring names.
//!
//! # Usage
//!
//! ```rust,no_run
//! use arcset_common::config::{AppConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AppConfig::load_or_default(Some(Path::new("arcset.toml")))?;
//!     println!("Region: {}", config.exchange.region);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_FREE_SEM, DEFAULT_MUTEX_SEM, DEFAULT_REGION_NAME, DEFAULT_USED_SEM,
    DEFAULT_WAIT_POLL_MS, MAX_NAME_LEN,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
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

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields shared by both binaries.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "arcset-supervisor-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "arcset".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Names of the kernel objects backing the ring, plus wait tuning.
///
/// # TOML Example
///
/// ```toml
/// [exchange]
/// region = "/graphresult"
/// used_semaphore = "/fb_arc_set_used_sem"
/// free_semaphore = "/fb_arc_set_free_sem"
/// mutex_semaphore = "/fb_arc_set_mutex_sem"
/// wait_poll_ms = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeConfig {
    /// Shared memory region name.
    pub region: String,
    /// Semaphore counting occupied slots.
    pub used_semaphore: String,
    /// Semaphore counting free slots.
    pub free_semaphore: String,
    /// Binary semaphore guarding the write cursor.
    pub mutex_semaphore: String,
    /// Length of one bounded wait slice in milliseconds.
    pub wait_poll_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION_NAME.to_string(),
            used_semaphore: DEFAULT_USED_SEM.to_string(),
            free_semaphore: DEFAULT_FREE_SEM.to_string(),
            mutex_semaphore: DEFAULT_MUTEX_SEM.to_string(),
            wait_poll_ms: DEFAULT_WAIT_POLL_MS,
        }
    }
}

impl ExchangeConfig {
    /// Derive all four object names from one prefix, e.g. `"run42"` gives
    /// `/run42_shm`, `/run42_used`, `/run42_free`, `/run42_mutex`.
    pub fn namespaced(prefix: &str) -> Self {
        Self {
            region: format!("/{prefix}_shm"),
            used_semaphore: format!("/{prefix}_used"),
            free_semaphore: format!("/{prefix}_free"),
            mutex_semaphore: format!("/{prefix}_mutex"),
            ..Self::default()
        }
    }

    /// Length of one bounded wait slice.
    pub fn wait_poll(&self) -> Duration {
        Duration::from_millis(self.wait_poll_ms)
    }

    /// All object names, region first.
    pub fn names(&self) -> [&str; 4] {
        [
            &self.region,
            &self.used_semaphore,
            &self.free_semaphore,
            &self.mutex_semaphore,
        ]
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - a name does not start with `/`, contains another `/`, is empty
    ///   after the slash, or exceeds the POSIX name limit
    /// - two names are equal
    /// - `wait_poll_ms` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = self.names();
        for name in names {
            validate_object_name(name)?;
        }
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].contains(a) {
                return Err(ConfigError::ValidationError(format!(
                    "object name {a:?} used more than once"
                )));
            }
        }
        if self.wait_poll_ms == 0 {
            return Err(ConfigError::ValidationError(
                "wait_poll_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_object_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |why: &str| ConfigError::ValidationError(format!("object name {name:?} {why}"));
    let rest = name
        .strip_prefix('/')
        .ok_or_else(|| invalid("must start with '/'"))?;
    if rest.is_empty() {
        return Err(invalid("is empty"));
    }
    if rest.contains('/') {
        return Err(invalid("must not contain '/' after the first character"));
    }
    if rest.contains('\0') {
        return Err(invalid("must not contain NUL"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("is too long"));
    }
    Ok(())
}

/// Top-level configuration file of both binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging and instance identity.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Kernel object names.
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

impl AppConfig {
    /// Load from `path` if given, otherwise use defaults. Validates either way.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigLoader::load`] and validation errors.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first section's `ConfigError::ValidationError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.exchange.validate()
    }
}

/// Trait for loading configuration from TOML files.
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

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
