//! API Handlers
//!
//! HTTP request handlers for the admin endpoints. Every handler is a thin
//! adapter over [`TemporalState`].

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::cache::CacheStats;
use crate::config::Config;
use crate::error::{retry_after_secs, Result, StateError};
use crate::limiter::{BlockRecord, RateLimitStatus};
use crate::models::{
    BlockRequest, BlockResponse, CheckRequest, ClearResponse, EventsParams, HealthResponse,
    StatusParams,
};
use crate::security::SecurityEvent;
use crate::state::{SecurityStats, TemporalState};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub state: Arc<TemporalState>,
}

impl AppState {
    pub fn new(state: Arc<TemporalState>) -> Self {
        Self { state }
    }

    /// Builds the subsystem on the wall clock and the current tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Arc::new(TemporalState::from_config(config)?)))
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Cache ==

/// Handler for GET /stats/cache
pub async fn cache_stats_handler(
    State(app): State<AppState>,
) -> Json<BTreeMap<String, CacheStats>> {
    Json(app.state.caches().stats())
}

/// Handler for DELETE /cache
pub async fn clear_all_handler(State(app): State<AppState>) -> Json<ClearResponse> {
    app.state.caches().clear_all();
    info!("All caches cleared via admin API");
    Json(ClearResponse::all())
}

/// Handler for DELETE /cache/:domain
pub async fn clear_domain_handler(
    State(app): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<ClearResponse>> {
    app.state.caches().clear_domain(&domain)?;
    Ok(Json(ClearResponse::domain(&domain)))
}

/// Handler for DELETE /users/:user_id/cache
pub async fn clear_user_handler(
    State(app): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<ClearResponse> {
    let removed = app.state.caches().clear_user(&user_id);
    Json(ClearResponse::user(&user_id, removed))
}

// == Security ==

/// Handler for GET /stats/security
pub async fn security_stats_handler(State(app): State<AppState>) -> Json<SecurityStats> {
    Json(app.state.security_stats())
}

/// Handler for GET /security/events
///
/// Without filters returns the newest events first; with any filter returns
/// matches oldest first, capped at `limit`.
pub async fn events_handler(
    State(app): State<AppState>,
    Query(params): Query<EventsParams>,
) -> Json<Vec<SecurityEvent>> {
    let limit = params.limit();
    let query = params.query();
    let unfiltered =
        query.start.is_none() && query.end.is_none() && query.kind.is_none() && query.identifier.is_none();

    let events = if unfiltered {
        app.state.events().recent(limit)
    } else {
        let mut matches = app.state.events().query(&query);
        matches.truncate(limit);
        matches
    };
    Json(events)
}

// == Rate Limiting ==

/// Handler for POST /rate-limit/check
///
/// Responds 200 when admitted and 429 with the decision body when refused.
pub async fn check_handler(
    State(app): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Response> {
    if let Some(error_msg) = req.validate() {
        return Err(StateError::InvalidRequest(error_msg));
    }

    let decision = app.state.limiter().is_allowed(&req.identifier, &req.config());
    let Some(retry_after_ms) = decision.retry_after_ms.filter(|_| !decision.allowed) else {
        return Ok(Json(decision).into_response());
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(decision)).into_response();
    response.headers_mut().insert(
        header::RETRY_AFTER,
        HeaderValue::from(retry_after_secs(retry_after_ms)),
    );
    Ok(response)
}

/// Handler for GET /rate-limit/:identifier
pub async fn status_handler(
    State(app): State<AppState>,
    Path(identifier): Path<String>,
    Query(params): Query<StatusParams>,
) -> Json<RateLimitStatus> {
    Json(app.state.limiter().get_status(&identifier, &params.config()))
}

/// Handler for GET /blocks
pub async fn list_blocks_handler(State(app): State<AppState>) -> Json<Vec<BlockRecord>> {
    Json(app.state.limiter().blocked_identifiers())
}

/// Handler for POST /blocks
pub async fn block_handler(
    State(app): State<AppState>,
    Json(req): Json<BlockRequest>,
) -> Result<Json<BlockResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(StateError::InvalidRequest(error_msg));
    }

    let blocked_until = app
        .state
        .limiter()
        .block_identifier(&req.identifier, req.duration());
    Ok(Json(BlockResponse::blocked(req.identifier, blocked_until)))
}

/// Handler for DELETE /blocks/:identifier
pub async fn unblock_handler(
    State(app): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<BlockResponse>> {
    if !app.state.limiter().unblock_identifier(&identifier) {
        return Err(StateError::NotFound(format!(
            "Identifier '{}' is not blocked",
            identifier
        )));
    }
    Ok(Json(BlockResponse::unblocked(identifier)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{user_key, TRANSACTIONS, USER_DATA};
    use crate::clock::ManualClock;
    use crate::limiter::RateLimitPreset;
    use serde_json::json;

    fn app() -> (Arc<ManualClock>, AppState) {
        let clock = Arc::new(ManualClock::new(1_000));
        let state = TemporalState::new(&Config::default(), clock.clone(), clock.clone());
        (clock, AppState::new(Arc::new(state)))
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_cache_stats_lists_every_domain() {
        let (_clock, app) = app();
        let stats = cache_stats_handler(State(app)).await;
        let names: Vec<&str> = stats.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["attachments", "stats", "transactions", "userData"]);
    }

    #[tokio::test]
    async fn test_clear_unknown_domain_fails() {
        let (_clock, app) = app();
        let result = clear_domain_handler(State(app), Path("nope".to_string())).await;
        assert!(matches!(result, Err(StateError::UnknownCache(_))));
    }

    #[tokio::test]
    async fn test_clear_user_handler() {
        let (_clock, app) = app();
        let caches = app.state.caches();
        caches
            .get(USER_DATA)
            .unwrap()
            .set(&user_key("u1", "profile"), json!({}));
        caches
            .get(TRANSACTIONS)
            .unwrap()
            .set(&user_key("u1", "recent"), json!([]));
        caches
            .get(TRANSACTIONS)
            .unwrap()
            .set(&user_key("u2", "recent"), json!([]));

        let response = clear_user_handler(State(app.clone()), Path("u1".to_string())).await;
        assert_eq!(response.removed, Some(2));
        assert!(app
            .state
            .caches()
            .get(TRANSACTIONS)
            .unwrap()
            .has(&user_key("u2", "recent")));
    }

    #[tokio::test]
    async fn test_check_handler_refuses_with_429() {
        let (_clock, app) = app();
        let req = || CheckRequest {
            identifier: "login_bob_1.1.1.1".to_string(),
            preset: RateLimitPreset::Auth,
        };

        for _ in 0..5 {
            let response = check_handler(State(app.clone()), Json(req())).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = check_handler(State(app), Json(req())).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(900u64)
        );
    }

    #[tokio::test]
    async fn test_check_handler_rejects_empty_identifier() {
        let (_clock, app) = app();
        let req = CheckRequest {
            identifier: String::new(),
            preset: RateLimitPreset::Api,
        };
        let result = check_handler(State(app), Json(req)).await;
        assert!(matches!(result, Err(StateError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_block_and_unblock_handlers() {
        let (_clock, app) = app();
        let req = BlockRequest {
            identifier: "10.0.0.1".to_string(),
            duration_ms: 60_000,
        };

        let response = block_handler(State(app.clone()), Json(req)).await.unwrap();
        assert_eq!(response.blocked_until, Some(61_000));

        let blocks = list_blocks_handler(State(app.clone())).await;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].identifier, "10.0.0.1");

        let response = unblock_handler(State(app.clone()), Path("10.0.0.1".to_string()))
            .await
            .unwrap();
        assert!(!response.blocked);

        let again = unblock_handler(State(app), Path("10.0.0.1".to_string())).await;
        assert!(matches!(again, Err(StateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_events_handler_filters_by_kind() {
        let (_clock, app) = app();
        app.state
            .limiter()
            .block_identifier("10.0.0.1", std::time::Duration::from_secs(1));

        let all = events_handler(State(app.clone()), Query(EventsParams::default())).await;
        assert_eq!(all.len(), 1);

        let params = EventsParams {
            kind: Some(crate::security::EventKind::DataExposure),
            ..Default::default()
        };
        let none = events_handler(State(app), Query(params)).await;
        assert!(none.is_empty());
    }
}
