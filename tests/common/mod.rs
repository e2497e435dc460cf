//! Shared helpers for integration tests

#![allow(dead_code)]

use parking_lot::Mutex;

use durable_cache::cache::ByteIdentity;
use durable_cache::error::PersistenceError;
use durable_cache::persistence::{
    MemorySolver, OperationKind, OperationRecord, PersistedEntry, PersistenceSolver,
};

/// [`MemorySolver`] that also remembers every record and cleanup it was handed.
#[derive(Debug, Default)]
pub struct RecordingSolver {
    inner: MemorySolver,
    disposed: Mutex<Vec<OperationRecord>>,
    cleanups: Mutex<Vec<ByteIdentity>>,
}

impl RecordingSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disposed(&self) -> Vec<OperationRecord> {
        self.disposed.lock().clone()
    }

    pub fn disposed_count(&self, kind: OperationKind) -> usize {
        self.disposed
            .lock()
            .iter()
            .filter(|record| record.kind == kind)
            .count()
    }

    pub fn cleanups(&self) -> Vec<ByteIdentity> {
        self.cleanups.lock().clone()
    }

    pub fn get(&self, key: &ByteIdentity) -> Option<PersistedEntry> {
        self.inner.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl PersistenceSolver for RecordingSolver {
    fn dispose(&self, record: &OperationRecord) -> Result<(), PersistenceError> {
        self.disposed.lock().push(record.clone());
        self.inner.dispose(record)
    }

    fn cleanup(&self, key: &ByteIdentity) -> Result<bool, PersistenceError> {
        self.cleanups.lock().push(key.clone());
        self.inner.cleanup(key)
    }

    fn enumerate(&self) -> Result<Vec<PersistedEntry>, PersistenceError> {
        self.inner.enumerate()
    }
}
