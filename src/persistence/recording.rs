//! Recording Solver
//!
//! Test wrapper around [`MemorySolver`] that remembers every record and
//! cleanup it was handed, so tests can assert on what was dispatched.

use parking_lot::Mutex;

use crate::cache::ByteIdentity;
use crate::error::PersistenceError;
use crate::persistence::{
    MemorySolver, OperationKind, OperationRecord, PersistedEntry, PersistenceSolver,
};

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

    /// Every record dispatched so far, in order.
    pub fn disposed(&self) -> Vec<OperationRecord> {
        self.disposed.lock().clone()
    }

    /// How many dispatched records were of `kind`.
    pub fn disposed_count(&self, kind: OperationKind) -> usize {
        self.disposed
            .lock()
            .iter()
            .filter(|record| record.kind == kind)
            .count()
    }

    /// Every cleanup request so far, in order.
    pub fn cleanups(&self) -> Vec<ByteIdentity> {
        self.cleanups.lock().clone()
    }

    pub fn get(&self, key: &ByteIdentity) -> Option<PersistedEntry> {
        self.inner.get(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
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
