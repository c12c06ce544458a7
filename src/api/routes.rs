//! API Routes
//!
//! Configures the Axum router with the admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    block_handler, cache_stats_handler, check_handler, clear_all_handler, clear_domain_handler,
    clear_user_handler, events_handler, health_handler, list_blocks_handler,
    security_stats_handler, status_handler, unblock_handler, AppState,
};

/// Creates the admin router.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats/cache` - Per-domain cache statistics
/// - `DELETE /cache` - Clear every cache
/// - `DELETE /cache/:domain` - Clear one cache
/// - `DELETE /users/:user_id/cache` - Drop one user's cached data
/// - `GET /stats/security` - Security event counts and active blocks
/// - `GET /security/events` - Query the security event log
/// - `POST /rate-limit/check` - Admission check against a preset
/// - `GET /rate-limit/:identifier` - Window and block status
/// - `GET /blocks`, `POST /blocks` - List or create blocks
/// - `DELETE /blocks/:identifier` - Lift a block
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats/cache", get(cache_stats_handler))
        .route("/stats/security", get(security_stats_handler))
        .route("/cache", delete(clear_all_handler))
        .route("/cache/:domain", delete(clear_domain_handler))
        .route("/users/:user_id/cache", delete(clear_user_handler))
        .route("/security/events", get(events_handler))
        .route("/rate-limit/check", post(check_handler))
        .route("/rate-limit/:identifier", get(status_handler))
        .route("/blocks", get(list_blocks_handler).post(block_handler))
        .route("/blocks/:identifier", delete(unblock_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
