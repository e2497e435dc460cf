//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for `GET /get/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /set` and `PUT /set-if-absent`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub key: String,
    /// False when `set-if-absent` found a live entry
    pub stored: bool,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, stored: bool) -> Self {
        Self {
            key: key.into(),
            stored,
        }
    }
}

/// Response body for `GET /ttl/:key`
#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    pub key: String,
    /// Remaining time to live in milliseconds
    pub ttl_ms: u64,
}

impl TtlResponse {
    pub fn new(key: impl Into<String>, remaining: Duration) -> Self {
        Self {
            key: key.into(),
            ttl_ms: remaining.as_millis() as u64,
        }
    }
}

/// Response body for `PUT /ttl/:key` and `POST /ttl/:key/reset`
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResponse {
    pub key: String,
    pub updated: bool,
}

impl UpdateResponse {
    pub fn new(key: impl Into<String>, updated: bool) -> Self {
        Self {
            key: key.into(),
            updated,
        }
    }
}

/// Response body for `DELETE /del/:key` and `POST /del`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Number of live keys removed
    pub deleted: usize,
}

impl DeleteResponse {
    pub fn new(deleted: usize) -> Self {
        Self { deleted }
    }
}

/// Response body for `DELETE /all`
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    /// False when the cache was already empty
    pub flushed: bool,
}

impl FlushResponse {
    pub fn new(flushed: bool) -> Self {
        Self { flushed }
    }
}

/// Response body for `DELETE /similar/:prefix`
#[derive(Debug, Clone, Serialize)]
pub struct SimilarResponse {
    pub prefix: String,
    pub removed: HashMap<String, Value>,
}

impl SimilarResponse {
    pub fn new(prefix: impl Into<String>, removed: HashMap<String, Value>) -> Self {
        Self {
            prefix: prefix.into(),
            removed,
        }
    }
}

/// Response body for `PUT /replace`
#[derive(Debug, Clone, Serialize)]
pub struct ReplaceResponse {
    pub key: String,
    pub previous: Value,
}

impl ReplaceResponse {
    pub fn new(key: impl Into<String>, previous: Value) -> Self {
        Self {
            key: key.into(),
            previous,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
