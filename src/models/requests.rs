//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;

use crate::clock::Timestamp;
use crate::limiter::{RateLimitConfig, RateLimitPreset};
use crate::security::{EventKind, EventQuery};

/// Identifiers longer than this are rejected.
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Default page size for `GET /security/events`.
pub const DEFAULT_EVENT_LIMIT: usize = 100;

fn validate_identifier(identifier: &str) -> Option<String> {
    if identifier.is_empty() {
        return Some("Identifier cannot be empty".to_string());
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Some(format!(
            "Identifier exceeds maximum length of {} characters",
            MAX_IDENTIFIER_LEN
        ));
    }
    None
}

/// Request body for `POST /rate-limit/check`
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    /// Caller identity, e.g. `login_<user>_<ip>`
    pub identifier: String,
    /// Preset to check against (default: api)
    #[serde(default = "default_preset")]
    pub preset: RateLimitPreset,
}

fn default_preset() -> RateLimitPreset {
    RateLimitPreset::Api
}

impl CheckRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_identifier(&self.identifier)
    }

    pub fn config(&self) -> RateLimitConfig {
        self.preset.config()
    }
}

/// Request body for `POST /blocks`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub identifier: String,
    /// Block length in milliseconds
    pub duration_ms: u64,
}

impl BlockRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = validate_identifier(&self.identifier) {
            return Some(error);
        }
        if self.duration_ms == 0 {
            return Some("Block duration must be positive".to_string());
        }
        None
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Query string for `GET /security/events`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsParams {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    #[serde(rename = "type")]
    pub kind: Option<EventKind>,
    pub identifier: Option<String>,
    pub limit: Option<usize>,
}

impl EventsParams {
    pub fn query(&self) -> EventQuery {
        EventQuery {
            start: self.start,
            end: self.end,
            kind: self.kind,
            identifier: self.identifier.clone(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_EVENT_LIMIT)
    }
}

/// Query string for `GET /rate-limit/:identifier`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusParams {
    pub preset: Option<RateLimitPreset>,
}

impl StatusParams {
    pub fn config(&self) -> RateLimitConfig {
        self.preset.unwrap_or(RateLimitPreset::Api).config()
    }
}
