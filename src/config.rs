//! Runtime configuration.
//!
//! Settings come from a YAML file; the binary layers CLI flags and
//! environment variables on top after loading.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pool size used when the config file does not set one.
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Store deadline used when the config file does not set one.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

fn default_query_timeout() -> Duration {
    DEFAULT_QUERY_TIMEOUT
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds, e.g. `0.0.0.0`.
    pub bind: String,

    /// TCP port the listener binds.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Telemetry database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the store.
    pub path: String,

    /// Number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Deadline for a single store operation. A request whose store
    /// call exceeds it is answered with an internal error instead of
    /// hanging.
    #[serde(default = "default_query_timeout", with = "humantime_serde")]
    pub query_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "gauge.db".into(),
            pool_size: DEFAULT_POOL_SIZE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Everything the service needs to start.
///
/// Every section and field is optional in the file; an empty document
/// yields the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Read a YAML config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.bind is not an IP address: '{}'",
                self.server.bind
            )));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".into()));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Invalid("database.path is empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "database.pool_size must be at least 1".into(),
            ));
        }
        if self.database.query_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "database.query_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
