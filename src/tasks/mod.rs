//! Background Tasks Module
//!
//! Contains background tasks that run during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Expires cache entries at configured intervals, which feeds
//!   the expiration pipeline
//! - Persistence Worker: Applies operation records and durable cleanups off
//!   request threads

mod cleanup;
mod persistence;

pub use cleanup::spawn_cleanup_task;
pub use persistence::{spawn_persistence_worker, PersistenceJob, PersistenceQueue};
