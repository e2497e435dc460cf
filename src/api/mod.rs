//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a key-value pair
//! - `PUT /set-if-absent` - Store only if the key is not live
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /ttl/:key` - Remaining TTL of a key
//! - `PUT /ttl/:key` - Overwrite the TTL of a key
//! - `POST /ttl/:key/reset` - Restore the TTL a key was written with
//! - `DELETE /del/:key` - Delete a key
//! - `POST /del` - Delete many keys
//! - `DELETE /similar/:prefix` - Delete every key with a prefix
//! - `DELETE /all` - Flush the cache
//! - `PUT /replace` - Swap the value of a live key
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
