//! Cache Module
//!
//! Provides the in-memory expiring map that every command ultimately runs against.

mod entry;
mod identity;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, ExpiryPolicy};
pub use identity::ByteIdentity;
pub use stats::CacheStats;
pub use store::{CacheStore, ExpirationCallback, Expired};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
