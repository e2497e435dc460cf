//! Persistence Solver Module
//!
//! The pluggable durable backend and the registry it is resolved from.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::ByteIdentity;
use crate::error::PersistenceError;
use crate::persistence::{OperationKind, OperationRecord};

// == Solver Kind ==
/// Which registered solver a method's records go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Memory,
    File,
}

impl SolverKind {
    /// Whether applying a record performs blocking file I/O.
    pub fn blocks_on_io(self) -> bool {
        matches!(self, SolverKind::File)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Memory => f.write_str("memory"),
            SolverKind::File => f.write_str("file"),
        }
    }
}

impl FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(SolverKind::Memory),
            "file" | "disk" => Ok(SolverKind::File),
            other => Err(format!("unknown persistence solver '{other}'")),
        }
    }
}

// == Persisted Entry ==
/// One entry as the durable store remembers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub key: ByteIdentity,
    pub value: ByteIdentity,
    /// TTL the entry was written with
    pub ttl_ms: u64,
    /// Absolute expiry (Unix milliseconds)
    pub expires_at_ms: u64,
}

impl PersistedEntry {
    /// Time left at `now_ms`, or `None` once expired.
    pub fn remaining(&self, now_ms: u64) -> Option<Duration> {
        (self.expires_at_ms > now_ms).then(|| Duration::from_millis(self.expires_at_ms - now_ms))
    }
}

// == Persistence Solver ==
/// A durable backend. Implementations serialize their own access, so one
/// solver may be shared by request threads and the persistence worker.
pub trait PersistenceSolver: Send + Sync {
    /// Durably applies one gated operation.
    fn dispose(&self, record: &OperationRecord) -> Result<(), PersistenceError>;

    /// Erases whatever is recorded for `key`. Erasing a missing key is not
    /// an error. Returns whether anything was erased.
    fn cleanup(&self, key: &ByteIdentity) -> Result<bool, PersistenceError>;

    /// Everything currently recorded, for startup replay.
    fn enumerate(&self) -> Result<Vec<PersistedEntry>, PersistenceError>;
}

// == Durable Table ==
/// Keyed table both bundled solvers apply records to.
#[derive(Debug, Clone, Default)]
pub struct DurableTable {
    entries: BTreeMap<ByteIdentity, PersistedEntry>,
}

impl DurableTable {
    pub fn new() -> Self {
        Self::default()
    }

    // == Apply ==
    /// Applies `record` as of `now_ms`. Returns whether the table changed.
    ///
    /// Duration changes restart the countdown of recorded keys. A duration
    /// change that carries the value also records a key that had no entry.
    pub fn apply(&mut self, record: &OperationRecord, now_ms: u64) -> bool {
        match record.kind {
            OperationKind::Write => {
                let (Some(key), Some(value)) = (record.keys.first(), record.value.as_ref()) else {
                    return false;
                };
                let ttl_ms = millis(record.ttl.unwrap_or_default());
                self.insert(key, value, ttl_ms, now_ms);
                true
            }
            OperationKind::RemoveKeys | OperationKind::RemoveBySimilarity => record
                .keys
                .iter()
                .fold(false, |changed, key| self.entries.remove(key).is_some() || changed),
            OperationKind::RemoveAll => {
                let changed = !self.entries.is_empty();
                self.entries.clear();
                changed
            }
            OperationKind::ReplaceDuration | OperationKind::ResetDuration => {
                self.restart_clock(record, now_ms)
            }
            OperationKind::ReplaceValue => match record.value.clone() {
                Some(value) => self.update(record, |entry| entry.value = value.clone()),
                None => false,
            },
        }
    }

    // == Access ==
    /// Erases the entry for `key`. Returns whether one was recorded.
    pub fn remove(&mut self, key: &ByteIdentity) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn get(&self, key: &ByteIdentity) -> Option<&PersistedEntry> {
        self.entries.get(key)
    }

    /// Every recorded entry, ordered by key.
    pub fn entries(&self) -> Vec<PersistedEntry> {
        self.entries.values().cloned().collect()
    }

    /// Rebuilds a table from enumerated entries.
    pub fn from_entries(entries: impl IntoIterator<Item = PersistedEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.key.clone(), entry))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Internals ==
    fn insert(&mut self, key: &ByteIdentity, value: &ByteIdentity, ttl_ms: u64, now_ms: u64) {
        self.entries.insert(
            key.clone(),
            PersistedEntry {
                key: key.clone(),
                value: value.clone(),
                ttl_ms,
                expires_at_ms: now_ms.saturating_add(ttl_ms),
            },
        );
    }

    /// Restarts the countdown from `now_ms`. Uses the record's TTL when it
    /// has one and the recorded TTL otherwise.
    fn restart_clock(&mut self, record: &OperationRecord, now_ms: u64) -> bool {
        let mut changed = false;
        for key in &record.keys {
            if let Some(entry) = self.entries.get_mut(key) {
                let ttl_ms = record.ttl.map(millis).unwrap_or(entry.ttl_ms);
                entry.expires_at_ms = now_ms.saturating_add(ttl_ms);
                changed = true;
            } else if let (Some(value), Some(ttl)) = (record.value.as_ref(), record.ttl) {
                self.insert(key, value, millis(ttl), now_ms);
                changed = true;
            }
        }
        changed
    }

    /// Updates entries that are already recorded; unrecorded keys are skipped.
    fn update(&mut self, record: &OperationRecord, mut f: impl FnMut(&mut PersistedEntry)) -> bool {
        let mut changed = false;
        for key in &record.keys {
            if let Some(entry) = self.entries.get_mut(key) {
                f(entry);
                changed = true;
            }
        }
        changed
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// == Solver Registry ==
/// Solvers by kind, populated at startup.
#[derive(Default, Clone)]
pub struct SolverRegistry {
    solvers: HashMap<SolverKind, Arc<dyn PersistenceSolver>>,
}

impl SolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `solver` under `kind`, replacing any earlier registration.
    pub fn register(&mut self, kind: SolverKind, solver: Arc<dyn PersistenceSolver>) {
        self.solvers.insert(kind, solver);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, kind: SolverKind, solver: Arc<dyn PersistenceSolver>) -> Self {
        self.register(kind, solver);
        self
    }

    /// The solver registered for `kind`.
    ///
    /// # Errors
    /// [`PersistenceError::SolverNotFound`] when nothing is registered.
    pub fn resolve(&self, kind: SolverKind) -> Result<Arc<dyn PersistenceSolver>, PersistenceError> {
        self.solvers
            .get(&kind)
            .cloned()
            .ok_or(PersistenceError::SolverNotFound(kind))
    }

    /// Kinds with a registered solver, in no particular order.
    pub fn kinds(&self) -> Vec<SolverKind> {
        self.solvers.keys().copied().collect()
    }
}

impl fmt::Debug for SolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(text: &str) -> ByteIdentity {
        ByteIdentity::from(text)
    }

    fn write(key: &str, value: &str, ttl_secs: u64) -> OperationRecord {
        OperationRecord {
            kind: OperationKind::Write,
            keys: vec![id(key)],
            value: Some(id(value)),
            ttl: Some(Duration::from_secs(ttl_secs)),
        }
    }

    fn keyed(kind: OperationKind, keys: &[&str]) -> OperationRecord {
        OperationRecord {
            kind,
            keys: keys.iter().map(|key| id(key)).collect(),
            value: None,
            ttl: None,
        }
    }

    #[test]
    fn test_write_then_remove() {
        let mut table = DurableTable::new();
        assert!(table.apply(&write("a", "1", 120), 1_000));

        let entry = table.get(&id("a")).unwrap();
        assert_eq!(entry.ttl_ms, 120_000);
        assert_eq!(entry.expires_at_ms, 121_000);

        assert!(table.apply(&keyed(OperationKind::RemoveKeys, &["a", "b"]), 2_000));
        assert!(!table.apply(&keyed(OperationKind::RemoveKeys, &["a"]), 2_000));
        assert!(table.is_empty());
    }

    #[test]
    fn test_duration_changes() {
        let mut table = DurableTable::new();
        table.apply(&write("a", "1", 120), 0);

        let mut replace = keyed(OperationKind::ReplaceDuration, &["a"]);
        replace.ttl = Some(Duration::from_secs(600));
        assert!(table.apply(&replace, 10_000));
        assert_eq!(table.get(&id("a")).unwrap().expires_at_ms, 610_000);

        assert!(table.apply(&keyed(OperationKind::ResetDuration, &["a"]), 20_000));
        assert_eq!(table.get(&id("a")).unwrap().expires_at_ms, 140_000);

        assert!(!table.apply(&keyed(OperationKind::ResetDuration, &["zzz"]), 0));
    }

    #[test]
    fn test_duration_change_with_value_records_missing_key() {
        let mut table = DurableTable::new();

        let mut extend = keyed(OperationKind::ReplaceDuration, &["a"]);
        extend.ttl = Some(Duration::from_secs(3_600));
        assert!(!table.apply(&extend, 0));
        assert!(table.is_empty());

        extend.value = Some(id("1"));
        assert!(table.apply(&extend, 5_000));
        let entry = table.get(&id("a")).unwrap();
        assert_eq!(entry.value, id("1"));
        assert_eq!(entry.ttl_ms, 3_600_000);
        assert_eq!(entry.expires_at_ms, 3_605_000);
    }

    #[test]
    fn test_reset_with_ttl_keeps_recorded_ttl() {
        let mut table = DurableTable::new();
        table.apply(&write("a", "1", 120), 0);

        let mut reset = keyed(OperationKind::ResetDuration, &["a"]);
        reset.value = Some(id("1"));
        reset.ttl = Some(Duration::from_secs(90));
        assert!(table.apply(&reset, 1_000));

        let entry = table.get(&id("a")).unwrap();
        assert_eq!(entry.ttl_ms, 120_000);
        assert_eq!(entry.expires_at_ms, 91_000);
    }

    #[test]
    fn test_replace_value_only_touches_recorded_keys() {
        let mut table = DurableTable::new();
        table.apply(&write("a", "1", 120), 0);

        let mut replace = keyed(OperationKind::ReplaceValue, &["a"]);
        replace.value = Some(id("2"));
        assert!(table.apply(&replace, 0));
        assert_eq!(table.get(&id("a")).unwrap().value, id("2"));

        replace.keys = vec![id("b")];
        assert!(!table.apply(&replace, 0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_all() {
        let mut table = DurableTable::new();
        table.apply(&write("a", "1", 120), 0);
        table.apply(&write("b", "2", 120), 0);

        assert!(table.apply(&keyed(OperationKind::RemoveAll, &[]), 0));
        assert!(!table.apply(&keyed(OperationKind::RemoveAll, &[]), 0));
    }

    #[test]
    fn test_remaining() {
        let entry = PersistedEntry {
            key: id("a"),
            value: id("1"),
            ttl_ms: 1_000,
            expires_at_ms: 5_000,
        };
        assert_eq!(entry.remaining(4_000), Some(Duration::from_secs(1)));
        assert_eq!(entry.remaining(5_000), None);
    }

    #[test]
    fn test_registry_resolution() {
        let registry = SolverRegistry::new();
        assert!(matches!(
            registry.resolve(SolverKind::File),
            Err(PersistenceError::SolverNotFound(SolverKind::File))
        ));
    }

    #[test]
    fn test_only_file_solver_blocks_on_io() {
        assert!(SolverKind::File.blocks_on_io());
        assert!(!SolverKind::Memory.blocks_on_io());
    }

    #[test]
    fn test_solver_kind_from_str() {
        assert_eq!("FILE".parse::<SolverKind>(), Ok(SolverKind::File));
        assert_eq!("memory".parse::<SolverKind>(), Ok(SolverKind::Memory));
        assert!("redis".parse::<SolverKind>().is_err());
    }
}
