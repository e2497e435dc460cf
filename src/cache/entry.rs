//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::cache::ByteIdentity;

// == Expiry Policy ==
/// Which clock an entry's TTL runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// TTL counts from the last write.
    #[default]
    SinceCreation,
    /// TTL counts from the last successful read or write.
    SinceAccess,
}

impl std::str::FromStr for ExpiryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creation" | "created" | "since_creation" => Ok(Self::SinceCreation),
            "access" | "accessed" | "since_access" => Ok(Self::SinceAccess),
            other => Err(format!("unknown expiry policy '{other}'")),
        }
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: ByteIdentity,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Timestamp the TTL clock is measured from (Unix milliseconds)
    pub clock_start: u64,
    /// TTL the entry was written with
    pub original_ttl: Duration,
    /// TTL currently in force
    pub ttl: Duration,
    /// Clock source for expiry
    pub policy: ExpiryPolicy,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl` after now.
    pub fn new(value: ByteIdentity, ttl: Duration, policy: ExpiryPolicy) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            created_at: now,
            clock_start: now,
            original_ttl: ttl,
            ttl,
            policy,
        }
    }

    /// Rebuilds an entry replayed from durable state: `remaining` is in force
    /// now, `original_ttl` is what a reset restores.
    pub fn restored(
        value: ByteIdentity,
        original_ttl: Duration,
        remaining: Duration,
        policy: ExpiryPolicy,
    ) -> Self {
        let mut entry = Self::new(value, original_ttl, policy);
        entry.ttl = remaining;
        entry
    }

    // == Expires At ==
    /// Expiration timestamp in Unix milliseconds.
    pub fn expires_at(&self) -> u64 {
        self.clock_start
            .saturating_add(u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX))
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration
    /// time, so a zero TTL is expired immediately.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }

    // == Time To Live ==
    /// Returns the remaining TTL, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        Duration::from_millis(self.expires_at().saturating_sub(current_timestamp_ms()))
    }

    // == Touch ==
    /// Records a read. Re-arms the clock for `SinceAccess` entries.
    pub fn touch(&mut self) {
        if self.policy == ExpiryPolicy::SinceAccess {
            self.clock_start = current_timestamp_ms();
        }
    }

    /// Overwrites the TTL in force, counting from now.
    pub fn replace_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
        self.clock_start = current_timestamp_ms();
    }

    /// Restores the TTL the entry was written with, counting from now.
    pub fn reset_ttl(&mut self) {
        self.replace_ttl(self.original_ttl);
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn entry(ttl_ms: u64, policy: ExpiryPolicy) -> CacheEntry {
        CacheEntry::new(ByteIdentity::from("v"), Duration::from_millis(ttl_ms), policy)
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry(60_000, ExpiryPolicy::SinceCreation);

        assert_eq!(entry.value, ByteIdentity::from("v"));
        assert_eq!(entry.original_ttl, entry.ttl);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = entry(100, ExpiryPolicy::SinceCreation);

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(150));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = entry(10_000, ExpiryPolicy::SinceCreation);

        let remaining = entry.ttl_remaining();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry(0, ExpiryPolicy::SinceCreation);
        assert!(entry.is_expired_at(entry.clock_start));
    }

    #[test]
    fn test_touch_rearms_access_policy() {
        let mut entry = entry(200, ExpiryPolicy::SinceAccess);
        sleep(Duration::from_millis(120));
        entry.touch();
        sleep(Duration::from_millis(120));

        assert!(!entry.is_expired(), "read should have re-armed the clock");
    }

    #[test]
    fn test_touch_ignored_for_creation_policy() {
        let mut entry = entry(200, ExpiryPolicy::SinceCreation);
        let start = entry.clock_start;
        sleep(Duration::from_millis(20));
        entry.touch();

        assert_eq!(entry.clock_start, start);
    }

    #[test]
    fn test_replace_and_reset_ttl() {
        let mut entry = entry(10_000, ExpiryPolicy::SinceCreation);

        entry.replace_ttl(Duration::from_secs(120));
        assert_eq!(entry.ttl, Duration::from_secs(120));
        assert_eq!(entry.original_ttl, Duration::from_secs(10));

        entry.reset_ttl();
        assert_eq!(entry.ttl, Duration::from_secs(10));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("access".parse::<ExpiryPolicy>(), Ok(ExpiryPolicy::SinceAccess));
        assert_eq!("Creation".parse::<ExpiryPolicy>(), Ok(ExpiryPolicy::SinceCreation));
        assert!("lru".parse::<ExpiryPolicy>().is_err());
    }
}
