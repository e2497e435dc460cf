//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::MAX_KEY_LENGTH;

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for `PUT /set` and `PUT /set-if-absent`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in seconds; the configured default applies when absent
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.ttl == Some(0) {
            return Some("TTL must be positive".to_string());
        }
        validate_key(&self.key)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

/// Request body for `POST /del`
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteManyRequest {
    pub keys: Vec<String>,
}

/// Request body for `PUT /ttl/:key`
#[derive(Debug, Clone, Deserialize)]
pub struct TtlRequest {
    /// New TTL in seconds
    pub ttl: u64,
}

impl TtlRequest {
    pub fn validate(&self) -> Option<String> {
        (self.ttl == 0).then(|| "TTL must be positive".to_string())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

/// Request body for `PUT /replace`
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceRequest {
    pub key: String,
    pub value: Value,
}

impl ReplaceRequest {
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}
