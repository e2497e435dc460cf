//! Memory Solver
//!
//! Durable-store stand-in that keeps the durable table in process. Holds
//! nothing but the table, so its footprint tracks the number of durable
//! entries rather than write traffic.

use parking_lot::Mutex;

use crate::cache::{current_timestamp_ms, ByteIdentity};
use crate::error::PersistenceError;
use crate::persistence::{DurableTable, OperationRecord, PersistedEntry, PersistenceSolver};

// == Memory Solver ==
#[derive(Debug, Default)]
pub struct MemorySolver {
    table: Mutex<DurableTable>,
}

impl MemorySolver {
    /// Creates a solver with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from previously recorded entries.
    pub fn with_entries(entries: impl IntoIterator<Item = PersistedEntry>) -> Self {
        Self {
            table: Mutex::new(DurableTable::from_entries(entries)),
        }
    }

    /// The recorded entry for `key`, if any.
    pub fn get(&self, key: &ByteIdentity) -> Option<PersistedEntry> {
        self.table.lock().get(key).cloned()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}

impl PersistenceSolver for MemorySolver {
    fn dispose(&self, record: &OperationRecord) -> Result<(), PersistenceError> {
        self.table.lock().apply(record, current_timestamp_ms());
        Ok(())
    }

    fn cleanup(&self, key: &ByteIdentity) -> Result<bool, PersistenceError> {
        Ok(self.table.lock().remove(key))
    }

    fn enumerate(&self) -> Result<Vec<PersistedEntry>, PersistenceError> {
        Ok(self.table.lock().entries())
    }
}
