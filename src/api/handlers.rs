//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Every mutation goes
//! through the shared [`CacheCommands`] surface, so the persistence side
//! channel sees HTTP traffic exactly as it sees library calls.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::CacheStore;
use crate::commands::{CacheCommands, StoreCommands};
use crate::config::CacheConfiguration;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteManyRequest, DeleteResponse, FlushResponse, GetResponse, HealthResponse,
    ReplaceRequest, ReplaceResponse, SetRequest, SetResponse, SimilarResponse, StatsResponse,
    TtlRequest, TtlResponse, UpdateResponse,
};
use crate::persistence::{PersistentCommands, SolverRegistry};
use crate::tasks::PersistenceQueue;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Command surface, usually persistence-decorated
    pub commands: Arc<dyn CacheCommands>,
    /// The store behind `commands`, for stats
    pub store: Arc<CacheStore>,
}

impl AppState {
    pub fn new(commands: Arc<dyn CacheCommands>, store: Arc<CacheStore>) -> Self {
        Self { commands, store }
    }

    /// Builds a fresh store and wraps its commands with the persistence
    /// interceptor. `queue` switches dispatch to the async worker.
    pub fn from_config(
        config: Arc<CacheConfiguration>,
        registry: Arc<SolverRegistry>,
        queue: Option<PersistenceQueue>,
    ) -> Self {
        let store = Arc::new(CacheStore::new(config.expiry_policy()));
        let inner = StoreCommands::new(store.clone(), config.clone());
        let mut commands = PersistentCommands::new(inner, config, registry);
        if let Some(queue) = queue {
            commands = commands.with_queue(queue);
        }
        Self::new(Arc::new(commands), store)
    }
}

fn not_found(key: impl Into<String>) -> CacheError {
    CacheError::NotFound(key.into())
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let stored = match req.ttl() {
        Some(ttl) => state.commands.set_with_ttl(&req.key, &req.value, ttl)?,
        None => state.commands.set(&req.key, &req.value)?,
    };

    Ok(Json(SetResponse::new(req.key, stored)))
}

/// Handler for PUT /set-if-absent
pub async fn set_if_absent_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let stored = state
        .commands
        .set_if_absent(&req.key, &req.value, req.ttl())?;

    Ok(Json(SetResponse::new(req.key, stored)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let value = state.commands.get(&key)?.ok_or_else(|| not_found(&key))?;
    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for GET /ttl/:key
pub async fn ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TtlResponse>> {
    let remaining = state.commands.ttl(&key)?.ok_or_else(|| not_found(&key))?;
    Ok(Json(TtlResponse::new(key, remaining)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.commands.delete(std::slice::from_ref(&key))?;
    if deleted == 0 {
        return Err(not_found(key));
    }
    Ok(Json(DeleteResponse::new(deleted)))
}

/// Handler for POST /del
pub async fn delete_many_handler(
    State(state): State<AppState>,
    Json(req): Json<DeleteManyRequest>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.commands.delete(&req.keys)?;
    Ok(Json(DeleteResponse::new(deleted)))
}

/// Handler for DELETE /similar/:prefix
pub async fn delete_similar_handler(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> Result<Json<SimilarResponse>> {
    let removed = state.commands.delete_similar(&prefix)?;
    Ok(Json(SimilarResponse::new(prefix, removed)))
}

/// Handler for DELETE /all
pub async fn delete_all_handler(State(state): State<AppState>) -> Result<Json<FlushResponse>> {
    let flushed = state.commands.delete_all()?;
    Ok(Json(FlushResponse::new(flushed)))
}

/// Handler for PUT /ttl/:key
pub async fn replace_ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<TtlRequest>,
) -> Result<Json<UpdateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    if !state.commands.replace_duration(&key, req.duration())? {
        return Err(not_found(key));
    }
    Ok(Json(UpdateResponse::new(key, true)))
}

/// Handler for POST /ttl/:key/reset
pub async fn reset_ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<UpdateResponse>> {
    if !state.commands.reset_duration(&key)? {
        return Err(not_found(key));
    }
    Ok(Json(UpdateResponse::new(key, true)))
}

/// Handler for PUT /replace
pub async fn replace_handler(
    State(state): State<AppState>,
    Json(req): Json<ReplaceRequest>,
) -> Result<Json<ReplaceResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let previous = state
        .commands
        .replace(&req.key, &req.value)?
        .ok_or_else(|| not_found(&req.key))?;
    Ok(Json(ReplaceResponse::new(req.key, previous)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.store.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
