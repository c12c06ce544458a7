//! Security Event Module
//!
//! Event kinds, their fixed severities, and the immutable event record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Timestamp;

// == Severity ==
/// Static classification attached to an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

// == Event Kind ==
/// Kinds of notable events the log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A request arrived after the window's budget was spent
    RateLimitExceeded,
    /// An identifier was put in the blocked state
    BlockedIp,
    /// Credentials were rejected
    AuthenticationFailure,
    /// An authenticated caller touched something it does not own
    AuthorizationViolation,
    /// Input or behaviour that looks like probing
    SuspiciousActivity,
    /// Input failed validation
    InvalidInput,
    /// Data was returned to a caller that should not see it
    DataExposure,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::RateLimitExceeded,
        EventKind::BlockedIp,
        EventKind::AuthenticationFailure,
        EventKind::AuthorizationViolation,
        EventKind::SuspiciousActivity,
        EventKind::InvalidInput,
        EventKind::DataExposure,
    ];

    /// Fixed severity for this kind.
    pub fn severity(self) -> Severity {
        match self {
            EventKind::DataExposure => Severity::Critical,
            EventKind::AuthorizationViolation
            | EventKind::SuspiciousActivity
            | EventKind::BlockedIp => Severity::High,
            EventKind::RateLimitExceeded | EventKind::AuthenticationFailure => Severity::Medium,
            EventKind::InvalidInput => Severity::Low,
        }
    }

    /// Wire name, e.g. `rate_limit_exceeded`.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::RateLimitExceeded => "rate_limit_exceeded",
            EventKind::BlockedIp => "blocked_ip",
            EventKind::AuthenticationFailure => "authentication_failure",
            EventKind::AuthorizationViolation => "authorization_violation",
            EventKind::SuspiciousActivity => "suspicious_activity",
            EventKind::InvalidInput => "invalid_input",
            EventKind::DataExposure => "data_exposure",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event kind '{}'", s))
    }
}

// == Security Event ==
/// One recorded event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub identifier: String,
    /// Unix milliseconds
    pub timestamp: Timestamp,
    pub severity: Severity,
    pub metadata: Map<String, Value>,
}

impl SecurityEvent {
    pub fn new(
        kind: EventKind,
        identifier: impl Into<String>,
        timestamp: Timestamp,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            timestamp,
            severity: kind.severity(),
            metadata,
        }
    }

    /// Event time as a UTC datetime, if representable.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp as i64)
    }

    /// Human-readable one-line form.
    pub fn format(&self) -> String {
        let ts = self
            .occurred_at()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| self.timestamp.to_string());

        format!(
            "[{}] {:?} {} {}",
            ts, self.severity, self.kind, self.identifier
        )
    }
}
