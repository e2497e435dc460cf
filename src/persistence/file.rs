//! File Solver
//!
//! Keeps the durable table as a JSON snapshot. Every change rewrites the
//! snapshot through a temp file in the same directory and renames it into
//! place, so a crash leaves either the old or the new snapshot.
//!
//! Every write blocks on disk. The server runs this solver only behind the
//! persistence worker, which applies jobs on the blocking pool.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::cache::{current_timestamp_ms, ByteIdentity};
use crate::error::PersistenceError;
use crate::persistence::{DurableTable, OperationRecord, PersistedEntry, PersistenceSolver};

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "cache-snapshot.json";

// == File Solver ==
/// Solver backed by a JSON snapshot file.
#[derive(Debug)]
pub struct FileSolver {
    path: PathBuf,
    table: Mutex<DurableTable>,
}

impl FileSolver {
    /// Opens (or creates) the snapshot under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(SNAPSHOT_FILE);

        let table = if path.exists() {
            let bytes = fs::read(&path)?;
            let entries: Vec<PersistedEntry> = if bytes.is_empty() {
                Vec::new()
            } else {
                serde_json::from_slice(&bytes)?
            };
            info!("Loaded {} persisted entries from {}", entries.len(), path.display());
            DurableTable::from_entries(entries)
        } else {
            DurableTable::new()
        };

        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Snapshot ==
    /// Atomically replaces the snapshot with `table`'s entries.
    fn write_snapshot(&self, table: &DurableTable) -> Result<(), PersistenceError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, &table.entries())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        debug!("Snapshot written: {} entries", table.len());
        Ok(())
    }
}

impl PersistenceSolver for FileSolver {
    fn dispose(&self, record: &OperationRecord) -> Result<(), PersistenceError> {
        let mut table = self.table.lock();
        if table.apply(record, current_timestamp_ms()) {
            self.write_snapshot(&table)?;
        }
        Ok(())
    }

    fn cleanup(&self, key: &ByteIdentity) -> Result<bool, PersistenceError> {
        let mut table = self.table.lock();
        if !table.remove(key) {
            return Ok(false);
        }
        self.write_snapshot(&table)?;
        Ok(true)
    }

    fn enumerate(&self) -> Result<Vec<PersistedEntry>, PersistenceError> {
        Ok(self.table.lock().entries())
    }
}
