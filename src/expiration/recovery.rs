//! Recovery Module
//!
//! Startup replay of the durable store into the live map.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, info, warn};

use crate::cache::{current_timestamp_ms, CacheStore};
use crate::config::CacheConfiguration;
use crate::error::PersistenceError;
use crate::persistence::{PersistedEntry, SolverRegistry};

// == Listening Recovery ==
pub trait ListeningRecovery: Send + Sync {
    /// Value identity used to de-duplicate registrations. Defaults to the type name.
    fn identity(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Receives everything the durable store holds and reinserts what
    /// qualifies. Returns how many entries were restored.
    fn recover(&self, entries: &[PersistedEntry], store: &CacheStore) -> anyhow::Result<usize>;
}

// == Replay Recovery ==
/// Reinserts every entry whose TTL has not run out, with the time it has left.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayRecovery;

impl ListeningRecovery for ReplayRecovery {
    fn recover(&self, entries: &[PersistedEntry], store: &CacheStore) -> anyhow::Result<usize> {
        let now = current_timestamp_ms();
        let mut restored = 0;
        for entry in entries {
            let Some(remaining) = entry.remaining(now) else {
                continue;
            };
            let original = std::time::Duration::from_millis(entry.ttl_ms);
            if store.restore(entry.key.clone(), entry.value.clone(), original, remaining)? {
                restored += 1;
            }
        }
        Ok(restored)
    }
}

// == Recovery Report ==
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Entries the durable store held
    pub enumerated: usize,
    /// Entries reinserted, summed over listeners
    pub restored: usize,
    /// Durable records of already expired entries that were erased
    pub purged: usize,
    /// Listeners that returned an error or panicked
    pub failed: usize,
}

// == Run Recovery ==
/// Hands the durable snapshot to every recovery listener once, in
/// registration order, then erases records whose TTL ran out while the
/// process was down. Does nothing when persistence is disabled.
pub fn run_recovery(
    config: &CacheConfiguration,
    registry: &SolverRegistry,
    store: &CacheStore,
) -> Result<RecoveryReport, PersistenceError> {
    let mut report = RecoveryReport::default();
    if !config.is_enable_persistence() {
        return Ok(report);
    }

    let solver = registry.resolve(config.solver())?;
    let entries = solver.enumerate()?;
    report.enumerated = entries.len();

    for listener in config.recovery_listeners() {
        match catch_unwind(AssertUnwindSafe(|| listener.recover(&entries, store))) {
            Ok(Ok(restored)) => report.restored += restored,
            Ok(Err(err)) => {
                report.failed += 1;
                warn!("Recovery listener {} failed: {:#}", listener.identity(), err);
            }
            Err(_) => {
                report.failed += 1;
                error!("Recovery listener {} panicked", listener.identity());
            }
        }
    }

    let now = current_timestamp_ms();
    for entry in entries.iter().filter(|entry| entry.remaining(now).is_none()) {
        match solver.cleanup(&entry.key) {
            Ok(true) => report.purged += 1,
            Ok(false) => {}
            Err(err) => warn!("Cannot purge expired record {:?}: {}", entry.key, err),
        }
    }

    info!(
        "Recovery complete: {} persisted, {} restored, {} purged",
        report.enumerated, report.restored, report.purged
    );
    Ok(report)
}
