//! Configuration loading from the environment
//!
//! Variables are read from the process environment after an optional
//! `.env` file has been merged in with [`load_dotenv`]. Typed configuration
//! is deserialized with `envy`, so a field `port` under prefix `FANOUT`
//! reads `FANOUT_PORT`.

use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;

/// Error type for configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    #[error("Configuration error: {0}")]
    Envy(#[from] envy::Error),
}

/// Environment profile for the application.
///
/// Detected from the `FANOUT_ENV` environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Development environment with debug logging.
    Development,
    /// Production environment.
    Production,
    /// Custom environment name for specialized deployments.
    Custom(String),
}

impl Environment {
    /// Detect the current environment from `FANOUT_ENV`.
    ///
    /// Returns:
    /// - `Production` if `FANOUT_ENV` is "production" or "prod"
    /// - `Development` if `FANOUT_ENV` is "development", "dev", or not set
    /// - `Custom(name)` for any other value
    pub fn current() -> Self {
        Self::parse(std::env::var("FANOUT_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") | Some("prod") => Self::Production,
            Some("development") | Some("dev") | None => Self::Development,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    /// Get the environment name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Default log level for this environment.
    ///
    /// - Development: "debug"
    /// - Production and custom: "info"
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Self::Development => "debug",
            Self::Production | Self::Custom(_) => "info",
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Load configuration of type `T` from variables starting with `{prefix}_`.
pub fn from_env_prefixed<T: DeserializeOwned>(prefix: &str) -> Result<T, ConfigError> {
    Ok(envy::prefixed(format!("{}_", prefix)).from_env::<T>()?)
}

/// Load configuration of type `T` from an explicit set of variables.
///
/// Only pairs whose key starts with `{prefix}_` are considered.
pub fn from_iter_prefixed<T, I>(prefix: &str, vars: I) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (String, String)>,
{
    Ok(envy::prefixed(format!("{}_", prefix)).from_iter::<_, T>(vars)?)
}

/// Load environment variables from a `.env` file, if present.
///
/// Existing variables are never overridden. Returns `true` if a file was
/// loaded.
pub fn load_dotenv() -> bool {
    dotenvy::dotenv().is_ok()
}
