//! Commands Module
//!
//! The command surface callers program against. [`StoreCommands`] runs the
//! commands directly on a [`CacheStore`](crate::cache::CacheStore);
//! [`PersistentCommands`](crate::persistence::PersistentCommands) decorates any
//! implementation with the persistence side channel.

mod codec;
mod store_commands;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;

pub use codec::{Codec, JsonCodec};
pub use store_commands::StoreCommands;

// == Cache Commands ==
pub trait CacheCommands: Send + Sync {
    /// Stores a value with the configured default TTL. True if stored.
    fn set(&self, key: &str, value: &Value) -> Result<bool>;

    /// Stores a value with an explicit TTL. True if stored.
    fn set_with_ttl(&self, key: &str, value: &Value, ttl: Duration) -> Result<bool>;

    /// Stores a value only if the key is not live. True if stored.
    fn set_if_absent(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<bool>;

    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn contains(&self, key: &str) -> Result<bool>;

    /// Remaining TTL of a live key.
    fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Removes the given keys. Returns how many were live.
    fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Removes every key starting with `prefix` and returns what was removed.
    fn delete_similar(&self, prefix: &str) -> Result<HashMap<String, Value>>;

    /// Flushes the cache. True if anything was removed.
    fn delete_all(&self) -> Result<bool>;

    /// Overwrites the TTL of a live key.
    fn replace_duration(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Restores the TTL a live key was written with.
    fn reset_duration(&self, key: &str) -> Result<bool>;

    /// Swaps the value of a live key and returns the previous one.
    fn replace(&self, key: &str, value: &Value) -> Result<Option<Value>>;

    /// Reads a live entry without counting a hit or restarting its access clock.
    fn peek(&self, key: &str) -> Result<Option<EntryView>>;
}

// == Entry View ==
/// A live entry as [`CacheCommands::peek`] sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryView {
    pub value: Value,
    /// TTL the entry was written with
    pub original_ttl: Duration,
    /// TTL currently in force
    pub ttl: Duration,
}

// == Method ==
/// Identity of each command, used as the key of the persistence side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Set,
    SetWithTtl,
    SetIfAbsent,
    Get,
    Contains,
    Ttl,
    Delete,
    DeleteSimilar,
    DeleteAll,
    ReplaceDuration,
    ResetDuration,
    Replace,
}

impl Method {
    pub const ALL: [Method; 12] = [
        Method::Set,
        Method::SetWithTtl,
        Method::SetIfAbsent,
        Method::Get,
        Method::Contains,
        Method::Ttl,
        Method::Delete,
        Method::DeleteSimilar,
        Method::DeleteAll,
        Method::ReplaceDuration,
        Method::ResetDuration,
        Method::Replace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::Set => "set",
            Method::SetWithTtl => "set_with_ttl",
            Method::SetIfAbsent => "set_if_absent",
            Method::Get => "get",
            Method::Contains => "contains",
            Method::Ttl => "ttl",
            Method::Delete => "delete",
            Method::DeleteSimilar => "delete_similar",
            Method::DeleteAll => "delete_all",
            Method::ReplaceDuration => "replace_duration",
            Method::ResetDuration => "reset_duration",
            Method::Replace => "replace",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
