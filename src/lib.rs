//! Durable Cache - an expiring key-value cache with a persistence side channel
//!
//! Entries live in an in-memory TTL map. Writes long-lived enough to matter
//! are mirrored to a pluggable durable store, expirations fan out to
//! listeners, and startup replays the durable store back into memory.

pub mod api;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod expiration;
pub mod models;
pub mod persistence;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{ByteIdentity, CacheStore};
pub use commands::{CacheCommands, StoreCommands};
pub use config::{CacheConfiguration, Config};
pub use expiration::{run_recovery, ExpirationPipeline};
pub use persistence::{PersistentCommands, SolverRegistry};
pub use tasks::{spawn_cleanup_task, spawn_persistence_worker};
