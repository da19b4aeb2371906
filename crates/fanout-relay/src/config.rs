//! Relay configuration
//!
//! Read from `FANOUT_`-prefixed environment variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `FANOUT_HOST` | `0.0.0.0` |
//! | `FANOUT_PORT` | `8081` |
//! | `FANOUT_MAX_BODY_BYTES` | `1048576` |

use fanout_core::config::{from_env_prefixed, from_iter_prefixed};
use fanout_core::ConfigError;
use serde::Deserialize;

const ENV_PREFIX: &str = "FANOUT";

/// Default body limit for notification submissions (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Listener and intake settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind; `0` picks an ephemeral port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted notification body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl RelayConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        from_env_prefixed(ENV_PREFIX)
    }

    /// Load from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        from_iter_prefixed(ENV_PREFIX, vars)
    }

    /// Configuration bound to an ephemeral loopback port
    pub fn loopback() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Self::default()
        }
    }

    /// `host:port` string for the listener
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
