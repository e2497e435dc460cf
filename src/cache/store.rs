//! Cache Store Module
//!
//! The expiring map: HashMap storage keyed by [`ByteIdentity`] with TTL
//! expiration and an expiration callback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{
    ByteIdentity, CacheEntry, CacheStats, ExpiryPolicy, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::error::{CacheError, Result};

/// Key and value of an entry that left the store because its TTL elapsed.
pub type Expired = (ByteIdentity, ByteIdentity);

// == Expiration Callback ==
/// Receives every entry the store expires.
///
/// Invoked on whichever thread detected the expiry (usually the cleanup
/// task), never while the store lock is held, and exactly once per entry.
pub trait ExpirationCallback: Send + Sync {
    fn on_expired(&self, key: ByteIdentity, value: ByteIdentity);
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<ByteIdentity, CacheEntry>,
    stats: CacheStats,
}

// == Cache Store ==
/// Thread-safe expiring map. Every method takes `&self`.
pub struct CacheStore {
    state: Mutex<StoreState>,
    callback: RwLock<Option<Arc<dyn ExpirationCallback>>>,
    policy: ExpiryPolicy,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store whose entries expire under `policy`.
    pub fn new(policy: ExpiryPolicy) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            callback: RwLock::new(None),
            policy,
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Installs the callback that receives expired entries, replacing any previous one.
    pub fn set_expiration_callback(&self, callback: Arc<dyn ExpirationCallback>) {
        *self.callback.write() = Some(callback);
    }

    // == Put ==
    /// Stores a key-value pair that expires after `ttl`.
    ///
    /// Returns the previous live value, if any. A previous value whose TTL
    /// had already elapsed is reported as expired instead.
    pub fn put(
        &self,
        key: ByteIdentity,
        value: ByteIdentity,
        ttl: Duration,
    ) -> Result<Option<ByteIdentity>> {
        validate(&key, &value)?;
        let policy = self.policy;
        Ok(self.with_state(|state, now, expired| {
            expire_if_due(state, &key, now, expired);
            state
                .entries
                .insert(key, CacheEntry::new(value, ttl, policy))
                .map(|previous| previous.value)
        }))
    }

    // == Put If Absent ==
    /// Stores the pair only if no live entry exists for `key`.
    pub fn put_if_absent(
        &self,
        key: ByteIdentity,
        value: ByteIdentity,
        ttl: Duration,
    ) -> Result<bool> {
        validate(&key, &value)?;
        let policy = self.policy;
        Ok(self.with_state(|state, now, expired| {
            expire_if_due(state, &key, now, expired);
            if state.entries.contains_key(&key) {
                return false;
            }
            state.entries.insert(key, CacheEntry::new(value, ttl, policy));
            true
        }))
    }

    // == Restore ==
    /// Reinserts a replayed entry unless a live one already exists.
    pub fn restore(
        &self,
        key: ByteIdentity,
        value: ByteIdentity,
        original_ttl: Duration,
        remaining: Duration,
    ) -> Result<bool> {
        validate(&key, &value)?;
        let policy = self.policy;
        Ok(self.with_state(|state, now, expired| {
            expire_if_due(state, &key, now, expired);
            if state.entries.contains_key(&key) {
                return false;
            }
            let entry = CacheEntry::restored(value, original_ttl, remaining, policy);
            state.entries.insert(key, entry);
            true
        }))
    }

    // == Get ==
    /// Retrieves a live value, counting a hit or a miss.
    pub fn get(&self, key: &ByteIdentity) -> Option<ByteIdentity> {
        self.with_state(|state, now, expired| {
            expire_if_due(state, key, now, expired);
            match state.entries.get_mut(key) {
                Some(entry) => {
                    entry.touch();
                    let value = entry.value.clone();
                    state.stats.record_hit();
                    Some(value)
                }
                None => {
                    state.stats.record_miss();
                    None
                }
            }
        })
    }

    pub fn contains_key(&self, key: &ByteIdentity) -> bool {
        self.with_state(|state, now, expired| {
            expire_if_due(state, key, now, expired);
            state.entries.contains_key(key)
        })
    }

    /// Copy of a live entry. Leaves hit and miss counters and the access
    /// clock untouched.
    pub fn peek(&self, key: &ByteIdentity) -> Option<CacheEntry> {
        self.with_state(|state, now, expired| {
            expire_if_due(state, key, now, expired);
            state.entries.get(key).cloned()
        })
    }

    /// Remaining time to live of a live entry.
    pub fn ttl(&self, key: &ByteIdentity) -> Option<Duration> {
        self.with_state(|state, now, expired| {
            expire_if_due(state, key, now, expired);
            state.entries.get(key).map(CacheEntry::ttl_remaining)
        })
    }

    // == Remove ==
    /// Removes a live entry and returns its value.
    pub fn remove(&self, key: &ByteIdentity) -> Option<ByteIdentity> {
        self.with_state(|state, now, expired| {
            expire_if_due(state, key, now, expired);
            state.entries.remove(key).map(|entry| entry.value)
        })
    }

    /// Removes every live entry whose key satisfies `predicate`.
    pub fn remove_where<F>(&self, mut predicate: F) -> Vec<(ByteIdentity, ByteIdentity)>
    where
        F: FnMut(&ByteIdentity) -> bool,
    {
        self.with_state(|state, now, expired| {
            let doomed: Vec<ByteIdentity> = state
                .entries
                .iter()
                .filter(|(key, entry)| entry.is_expired_at(now) || predicate(key))
                .map(|(key, _)| key.clone())
                .collect();

            let mut removed = Vec::new();
            for key in doomed {
                if let Some((key, entry)) = state.entries.remove_entry(&key) {
                    if entry.is_expired_at(now) {
                        expired.push((key, entry.value));
                    } else {
                        removed.push((key, entry.value));
                    }
                }
            }
            removed
        })
    }

    /// Drops every entry. Returns how many live entries were removed.
    pub fn clear(&self) -> usize {
        self.with_state(|state, now, expired| {
            let mut live = 0;
            for (key, entry) in state.entries.drain() {
                if entry.is_expired_at(now) {
                    expired.push((key, entry.value));
                } else {
                    live += 1;
                }
            }
            live
        })
    }

    // == Duration Changes ==
    /// Overwrites the TTL of a live entry, counting from now.
    pub fn replace_ttl(&self, key: &ByteIdentity, ttl: Duration) -> bool {
        self.with_live_entry(key, |entry| entry.replace_ttl(ttl))
            .is_some()
    }

    /// Restores the TTL a live entry was written with, counting from now.
    pub fn reset_ttl(&self, key: &ByteIdentity) -> bool {
        self.with_live_entry(key, CacheEntry::reset_ttl).is_some()
    }

    /// Swaps the value of a live entry, keeping its TTL, and returns the old value.
    pub fn replace(&self, key: &ByteIdentity, value: ByteIdentity) -> Result<Option<ByteIdentity>> {
        validate(key, &value)?;
        Ok(self.with_live_entry(key, |entry| std::mem::replace(&mut entry.value, value)))
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and reports each to the expiration callback.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.with_state(|state, now, expired| {
            let keys: Vec<ByteIdentity> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in keys {
                if let Some((key, entry)) = state.entries.remove_entry(&key) {
                    expired.push((key, entry.value));
                }
            }
            expired.len()
        })
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    // == Internals ==
    /// Runs `f` under the lock, then hands anything it expired to the callback.
    fn with_state<R>(
        &self,
        f: impl FnOnce(&mut StoreState, u64, &mut Vec<Expired>) -> R,
    ) -> R {
        let mut expired = Vec::new();
        let result = {
            let mut state = self.state.lock();
            let result = f(&mut state, current_timestamp_ms(), &mut expired);
            state.stats.record_expirations(expired.len());
            let total = state.entries.len();
            state.stats.set_total_entries(total);
            result
        };
        self.notify(expired);
        result
    }

    fn with_live_entry<R>(
        &self,
        key: &ByteIdentity,
        f: impl FnOnce(&mut CacheEntry) -> R,
    ) -> Option<R> {
        self.with_state(|state, now, expired| {
            expire_if_due(state, key, now, expired);
            state.entries.get_mut(key).map(f)
        })
    }

    fn notify(&self, expired: Vec<Expired>) {
        if expired.is_empty() {
            return;
        }
        let callback = self.callback.read().clone();
        match callback {
            Some(callback) => {
                for (key, value) in expired {
                    callback.on_expired(key, value);
                }
            }
            None => trace!("{} entries expired with no callback installed", expired.len()),
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(ExpiryPolicy::default())
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("policy", &self.policy)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

fn expire_if_due(
    state: &mut StoreState,
    key: &ByteIdentity,
    now: u64,
    expired: &mut Vec<Expired>,
) {
    if state
        .entries
        .get(key)
        .is_some_and(|entry| entry.is_expired_at(now))
    {
        if let Some((key, entry)) = state.entries.remove_entry(key) {
            expired.push((key, entry.value));
        }
    }
}

fn validate(key: &ByteIdentity, value: &ByteIdentity) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if value.len() > MAX_VALUE_SIZE {
        return Err(CacheError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const LONG: Duration = Duration::from_secs(300);
    const SHORT: Duration = Duration::from_millis(50);

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Expired>>);

    impl ExpirationCallback for Recorder {
        fn on_expired(&self, key: ByteIdentity, value: ByteIdentity) {
            self.0.lock().push((key, value));
        }
    }

    fn id(text: &str) -> ByteIdentity {
        ByteIdentity::from(text)
    }

    fn store_with_recorder() -> (CacheStore, Arc<Recorder>) {
        let store = CacheStore::default();
        let recorder = Arc::new(Recorder::default());
        store.set_expiration_callback(recorder.clone());
        (store, recorder)
    }

    #[test]
    fn test_store_put_and_get() {
        let store = CacheStore::default();

        assert!(store.put(id("key1"), id("value1"), LONG).unwrap().is_none());
        assert_eq!(store.get(&id("key1")), Some(id("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite_returns_previous() {
        let store = CacheStore::default();

        store.put(id("key1"), id("value1"), LONG).unwrap();
        let previous = store.put(id("key1"), id("value2"), LONG).unwrap();

        assert_eq!(previous, Some(id("value1")));
        assert_eq!(store.get(&id("key1")), Some(id("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_if_absent() {
        let store = CacheStore::default();

        assert!(store.put_if_absent(id("k"), id("a"), LONG).unwrap());
        assert!(!store.put_if_absent(id("k"), id("b"), LONG).unwrap());
        assert_eq!(store.get(&id("k")), Some(id("a")));
    }

    #[test]
    fn test_store_remove() {
        let store = CacheStore::default();

        store.put(id("key1"), id("value1"), LONG).unwrap();
        assert_eq!(store.remove(&id("key1")), Some(id("value1")));
        assert!(store.is_empty());
        assert_eq!(store.remove(&id("key1")), None);
    }

    #[test]
    fn test_passive_expiry_fires_callback_once() {
        let (store, recorder) = store_with_recorder();

        store.put(id("c"), id("v"), SHORT).unwrap();
        sleep(Duration::from_millis(80));

        assert_eq!(store.get(&id("c")), None);
        assert_eq!(store.get(&id("c")), None);
        assert_eq!(store.cleanup_expired(), 0);

        let seen = recorder.0.lock();
        assert_eq!(seen.as_slice(), &[(id("c"), id("v"))]);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_remove_of_expired_entry_reports_expiry_not_removal() {
        let (store, recorder) = store_with_recorder();

        store.put(id("c"), id("v"), SHORT).unwrap();
        sleep(Duration::from_millis(80));

        assert_eq!(store.remove(&id("c")), None);
        assert_eq!(recorder.0.lock().len(), 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let (store, recorder) = store_with_recorder();

        store.put(id("key1"), id("value1"), SHORT).unwrap();
        store.put(id("key2"), id("value2"), LONG).unwrap();
        sleep(Duration::from_millis(80));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(recorder.0.lock().len(), 1);
        assert!(store.contains_key(&id("key2")));
    }

    #[test]
    fn test_remove_where_prefix() {
        let store = CacheStore::default();
        store.put(id("user:1"), id("a"), LONG).unwrap();
        store.put(id("user:2"), id("b"), LONG).unwrap();
        store.put(id("order:1"), id("c"), LONG).unwrap();

        let mut removed = store.remove_where(|key| key.starts_with(b"user:"));
        removed.sort();

        assert_eq!(removed, vec![(id("user:1"), id("a")), (id("user:2"), id("b"))]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_counts_live_entries() {
        let store = CacheStore::default();
        store.put(id("a"), id("1"), LONG).unwrap();
        store.put(id("b"), id("2"), LONG).unwrap();

        assert_eq!(store.clear(), 2);
        assert_eq!(store.clear(), 0);
    }

    #[test]
    fn test_replace_and_reset_ttl() {
        let store = CacheStore::default();
        store.put(id("k"), id("v"), Duration::from_secs(10)).unwrap();

        assert!(store.replace_ttl(&id("k"), Duration::from_secs(120)));
        assert!(store.ttl(&id("k")).unwrap() > Duration::from_secs(100));

        assert!(store.reset_ttl(&id("k")));
        assert!(store.ttl(&id("k")).unwrap() <= Duration::from_secs(10));

        assert!(!store.replace_ttl(&id("missing"), LONG));
        assert!(!store.reset_ttl(&id("missing")));
    }

    #[test]
    fn test_restore_keeps_original_ttl_for_reset() {
        let store = CacheStore::default();
        assert!(store
            .restore(id("k"), id("v"), Duration::from_secs(600), Duration::from_secs(5))
            .unwrap());
        assert!(store.ttl(&id("k")).unwrap() <= Duration::from_secs(5));

        assert!(store.reset_ttl(&id("k")));
        assert!(store.ttl(&id("k")).unwrap() > Duration::from_secs(500));

        assert!(!store.restore(id("k"), id("w"), LONG, LONG).unwrap());
        assert_eq!(store.get(&id("k")), Some(id("v")));
    }

    #[test]
    fn test_replace_value() {
        let store = CacheStore::default();
        store.put(id("k"), id("old"), LONG).unwrap();

        assert_eq!(store.replace(&id("k"), id("new")).unwrap(), Some(id("old")));
        assert_eq!(store.get(&id("k")), Some(id("new")));
        assert_eq!(store.replace(&id("missing"), id("x")).unwrap(), None);
    }

    #[test]
    fn test_access_policy_keeps_read_entries_alive() {
        let store = CacheStore::new(ExpiryPolicy::SinceAccess);
        store.put(id("k"), id("v"), Duration::from_millis(200)).unwrap();

        sleep(Duration::from_millis(120));
        assert!(store.get(&id("k")).is_some());
        sleep(Duration::from_millis(120));
        assert!(store.get(&id("k")).is_some());
    }

    #[test]
    fn test_store_stats() {
        let store = CacheStore::default();

        store.put(id("key1"), id("value1"), LONG).unwrap();
        store.get(&id("key1"));
        store.get(&id("nonexistent"));

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_key_too_long() {
        let store = CacheStore::default();
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = store.put(id(&long_key), id("value"), LONG);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_store_value_too_large() {
        let store = CacheStore::default();
        let large_value = "x".repeat(MAX_VALUE_SIZE + 1);

        let result = store.put(id("key"), id(&large_value), LONG);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
