//! Persistence Worker Task
//!
//! Background task that applies persistence jobs off the caller's thread.
//! Runs when async persistence is enabled or the configured solver blocks
//! on file I/O.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cache::ByteIdentity;
use crate::error::PersistenceError;
use crate::persistence::{dispatch, dispatch_cleanup, OperationRecord, SolverKind, SolverRegistry};

// == Persistence Job ==
/// One unit of work for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceJob {
    /// Apply a gated operation record
    Apply(OperationRecord),
    /// Erase the durable record of an expired key
    Cleanup(ByteIdentity),
}

/// Sending half of the persistence worker's queue.
#[derive(Debug, Clone)]
pub struct PersistenceQueue {
    tx: UnboundedSender<(SolverKind, PersistenceJob)>,
}

impl PersistenceQueue {
    /// Enqueues a record. Fails only once the worker has stopped.
    pub fn submit(&self, solver: SolverKind, record: OperationRecord) -> Result<(), PersistenceError> {
        self.send(solver, PersistenceJob::Apply(record))
    }

    /// Enqueues a durable cleanup behind every record submitted before it.
    pub fn submit_cleanup(&self, solver: SolverKind, key: ByteIdentity) -> Result<(), PersistenceError> {
        self.send(solver, PersistenceJob::Cleanup(key))
    }

    fn send(&self, solver: SolverKind, job: PersistenceJob) -> Result<(), PersistenceError> {
        self.tx
            .send((solver, job))
            .map_err(|_| PersistenceError::WorkerClosed)
    }
}

/// Spawns the worker that drains the queue in submission order.
///
/// Solvers may block on I/O, so each job runs on the blocking pool.
/// The task ends when every [`PersistenceQueue`] clone has been dropped.
pub fn spawn_persistence_worker(
    registry: Arc<SolverRegistry>,
) -> (PersistenceQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<(SolverKind, PersistenceJob)>();

    let handle = tokio::spawn(async move {
        info!("Starting persistence worker");

        while let Some((solver, job)) = rx.recv().await {
            let registry = registry.clone();
            let applied = tokio::task::spawn_blocking(move || match job {
                PersistenceJob::Apply(record) => dispatch(&registry, solver, &record),
                PersistenceJob::Cleanup(key) => dispatch_cleanup(&registry, solver, &key),
            })
            .await;
            if let Err(err) = applied {
                error!("Persistence job panicked: {}", err);
            }
        }

        info!("Persistence worker stopped");
    });

    (PersistenceQueue { tx }, handle)
}
