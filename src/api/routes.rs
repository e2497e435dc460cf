//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_all_handler, delete_handler, delete_many_handler, delete_similar_handler,
    get_handler, health_handler, replace_handler, replace_ttl_handler, reset_ttl_handler,
    set_handler, set_if_absent_handler, stats_handler, ttl_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/set-if-absent", put(set_if_absent_handler))
        .route("/get/:key", get(get_handler))
        .route("/ttl/:key", get(ttl_handler).put(replace_ttl_handler))
        .route("/ttl/:key/reset", post(reset_ttl_handler))
        .route("/del", post(delete_many_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/similar/:prefix", delete(delete_similar_handler))
        .route("/all", delete(delete_all_handler))
        .route("/replace", put(replace_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
