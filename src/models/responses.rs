//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies. Stats, decisions
//! and events serialize directly from their subsystem types.

use serde::Serialize;

use crate::clock::Timestamp;

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the cache clear endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    /// Entries removed, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
}

impl ClearResponse {
    pub fn all() -> Self {
        Self {
            message: "All caches cleared".to_string(),
            removed: None,
        }
    }

    pub fn domain(name: &str) -> Self {
        Self {
            message: format!("Cache '{}' cleared", name),
            removed: None,
        }
    }

    pub fn user(user_id: &str, removed: usize) -> Self {
        Self {
            message: format!("Cached data for user '{}' cleared", user_id),
            removed: Some(removed),
        }
    }
}

/// Response body for `POST /blocks` and `DELETE /blocks/:identifier`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub identifier: String,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<Timestamp>,
}

impl BlockResponse {
    pub fn blocked(identifier: impl Into<String>, blocked_until: Timestamp) -> Self {
        Self {
            identifier: identifier.into(),
            blocked: true,
            blocked_until: Some(blocked_until),
        }
    }

    pub fn unblocked(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            blocked: false,
            blocked_until: None,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
