//! TTL Cleanup Task
//!
//! Background task that periodically expires cache entries. Every entry it
//! removes is reported to the store's expiration callback from this task,
//! never from a caller's thread.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The sweep runs on the blocking pool because expiration listeners and the
/// durable cleanup they trigger may do I/O.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::default());
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 1);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(store: Arc<CacheStore>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let store = store.clone();
            let removed = match tokio::task::spawn_blocking(move || store.cleanup_expired()).await
            {
                Ok(removed) => removed,
                Err(err) => {
                    error!("TTL cleanup sweep panicked: {}", err);
                    continue;
                }
            };

            if removed > 0 {
                info!("TTL cleanup: expired {} entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
