//! Error types for the temporal state subsystem
//!
//! Cache lookups and rate-limit decisions are never errors; this enum covers
//! programmer mistakes (unknown cache domain), guard rejections and the admin
//! API surface.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == State Error Enum ==
/// Unified error type for the subsystem.
#[derive(Error, Debug)]
pub enum StateError {
    /// Cache domain was never registered
    #[error("Unknown cache: {0}")]
    UnknownCache(String),

    /// Admission denied by the rate limiter
    #[error("Too many attempts, retry in {} seconds", .retry_after_ms.div_ceil(1000))]
    RateLimited { retry_after_ms: u64 },

    /// Admin target does not exist (e.g. unblocking an identifier that is not blocked)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No async runtime available to drive timers
    #[error("Timer runtime unavailable: {0}")]
    TimerRuntime(String),
}

/// Rounds a millisecond delay up to whole seconds for user-facing messages.
pub fn retry_after_secs(retry_after_ms: u64) -> u64 {
    retry_after_ms.div_ceil(1000)
}

// == IntoResponse Implementation ==
impl IntoResponse for StateError {
    fn into_response(self) -> Response {
        let status = match &self {
            StateError::UnknownCache(_) | StateError::NotFound(_) => StatusCode::NOT_FOUND,
            StateError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            StateError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StateError::TimerRuntime(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        let mut response = (status, body).into_response();
        if let StateError::RateLimited { retry_after_ms } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after_ms)),
            );
        }
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the subsystem.
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(0), 0);
        assert_eq!(retry_after_secs(1), 1);
        assert_eq!(retry_after_secs(1000), 1);
        assert_eq!(retry_after_secs(1001), 2);
    }

    #[test]
    fn test_rate_limited_message() {
        let err = StateError::RateLimited {
            retry_after_ms: 4_500,
        };
        assert_eq!(err.to_string(), "Too many attempts, retry in 5 seconds");
    }

    #[test]
    fn test_rate_limited_response_has_retry_after() {
        let response = StateError::RateLimited {
            retry_after_ms: 30_000,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(30u64)
        );
    }

    #[test]
    fn test_timer_runtime_is_server_error() {
        let response = StateError::TimerRuntime("no reactor".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unknown_cache_is_not_found() {
        let response = StateError::UnknownCache("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
