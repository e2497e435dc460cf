//! Configuration Module
//!
//! Server settings loaded from environment variables, plus the sealed
//! [`CacheConfiguration`] context shared by the interceptor and the
//! expiration pipeline.

mod catalog;
mod settings;
mod source;
mod unit;

use std::env;
use std::path::PathBuf;

pub use catalog::ListenerCatalog;
pub use settings::{
    CacheConfiguration, CacheConfigurationBuilder, DEFAULT_CACHE_DURATION,
    DEFAULT_CACHE_DURATION_UNIT, DEFAULT_CRITICAL_DURATION, DEFAULT_CRITICAL_DURATION_UNIT,
};
pub use source::{parsed, EnvSource, MapSource, PropertySource, ENV_PREFIX};
pub use unit::TimeUnit;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Directory holding the file solver's snapshot
    pub data_dir: PathBuf,
    /// Expiration listeners to bind at startup
    pub expiration_listeners: Vec<String>,
    /// Recovery listeners to bind at startup
    pub recovery_listeners: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `DATA_DIR` - File solver directory (default: ./data)
    /// - `EXPIRATION_LISTENERS` - Comma separated names (default: logging)
    /// - `RECOVERY_LISTENERS` - Comma separated names (default: replay)
    ///
    /// Cache behaviour is read separately through [`EnvSource`] (`CACHE_*`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            expiration_listeners: env::var("EXPIRATION_LISTENERS")
                .map(|v| split_names(&v))
                .unwrap_or(defaults.expiration_listeners),
            recovery_listeners: env::var("RECOVERY_LISTENERS")
                .map(|v| split_names(&v))
                .unwrap_or(defaults.recovery_listeners),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: 1,
            data_dir: PathBuf::from("./data"),
            expiration_listeners: vec!["logging".to_string()],
            recovery_listeners: vec!["replay".to_string()],
        }
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
