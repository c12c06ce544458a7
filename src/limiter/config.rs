//! Rate Limit Configuration
//!
//! Window sizes, presets, and the progressive block escalation table.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

// == Rate Limit Config ==
/// Budget of requests per fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Window length
    #[serde(serialize_with = "serialize_millis", rename = "windowMs")]
    pub window: Duration,
    /// Requests admitted per window
    pub max_requests: u32,
    /// Successful requests are handed back via `record_request`
    pub skip_successful_requests: bool,
    /// Failed requests are handed back via `record_request`
    pub skip_failed_requests: bool,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl RateLimitConfig {
    /// General API traffic: 100 per 15 minutes.
    pub const API: RateLimitConfig = RateLimitConfig::new(Duration::from_secs(15 * 60), 100);
    /// Login and registration: 5 per 15 minutes.
    pub const AUTH: RateLimitConfig = RateLimitConfig::new(Duration::from_secs(15 * 60), 5);
    /// Attachment uploads: 10 per hour.
    pub const UPLOAD: RateLimitConfig = RateLimitConfig::new(HOUR, 10);
    /// Database calls: 1000 per minute.
    pub const DATABASE: RateLimitConfig = RateLimitConfig::new(MINUTE, 1000);
    /// Bulk user actions: 30 per minute.
    pub const USER_ACTION: RateLimitConfig = RateLimitConfig::new(MINUTE, 30);

    /// A zero budget is treated as one request per window.
    pub const fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests: if max_requests == 0 { 1 } else { max_requests },
            skip_successful_requests: false,
            skip_failed_requests: false,
        }
    }

    pub fn skip_successful(mut self, skip: bool) -> Self {
        self.skip_successful_requests = skip;
        self
    }

    pub fn skip_failed(mut self, skip: bool) -> Self {
        self.skip_failed_requests = skip;
        self
    }

    pub fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

// == Rate Limit Preset ==
/// Named preset, as accepted by the admin API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPreset {
    Api,
    Auth,
    Upload,
    Database,
    UserAction,
}

impl RateLimitPreset {
    pub fn config(self) -> RateLimitConfig {
        match self {
            RateLimitPreset::Api => RateLimitConfig::API,
            RateLimitPreset::Auth => RateLimitConfig::AUTH,
            RateLimitPreset::Upload => RateLimitConfig::UPLOAD,
            RateLimitPreset::Database => RateLimitConfig::DATABASE,
            RateLimitPreset::UserAction => RateLimitConfig::USER_ACTION,
        }
    }
}

impl fmt::Display for RateLimitPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RateLimitPreset::Api => "api",
            RateLimitPreset::Auth => "auth",
            RateLimitPreset::Upload => "upload",
            RateLimitPreset::Database => "database",
            RateLimitPreset::UserAction => "user_action",
        };
        f.write_str(name)
    }
}

impl FromStr for RateLimitPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api" => Ok(RateLimitPreset::Api),
            "auth" => Ok(RateLimitPreset::Auth),
            "upload" => Ok(RateLimitPreset::Upload),
            "database" => Ok(RateLimitPreset::Database),
            "user_action" => Ok(RateLimitPreset::UserAction),
            other => Err(format!("unknown rate limit preset '{}'", other)),
        }
    }
}

// == Block Tiers ==
/// One escalation step: up to `max_violations` violations block for `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTier {
    pub max_violations: u32,
    pub duration: Duration,
}

/// Progressive blocking table, checked in ascending `max_violations` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTiers {
    tiers: Vec<BlockTier>,
    beyond: Duration,
}

impl BlockTiers {
    /// Builds a table from steps plus the duration applied past the last step.
    pub fn new(mut tiers: Vec<BlockTier>, beyond: Duration) -> Self {
        tiers.sort_by_key(|tier| tier.max_violations);
        Self { tiers, beyond }
    }

    /// Block duration for a violation count; `None` means no block.
    pub fn duration_for(&self, violations: u32) -> Option<Duration> {
        let duration = self
            .tiers
            .iter()
            .find(|tier| violations <= tier.max_violations)
            .map_or(self.beyond, |tier| tier.duration);

        (!duration.is_zero()).then_some(duration)
    }
}

impl Default for BlockTiers {
    /// `<=1` none, `<=3` 5 min, `<=5` 15 min, `<=10` 1 hour, beyond 24 hours.
    fn default() -> Self {
        Self::new(
            vec![
                BlockTier { max_violations: 1, duration: Duration::ZERO },
                BlockTier { max_violations: 3, duration: 5 * MINUTE },
                BlockTier { max_violations: 5, duration: 15 * MINUTE },
                BlockTier { max_violations: 10, duration: HOUR },
            ],
            24 * HOUR,
        )
    }
}

// == Identifier Helpers ==
/// Identifier for login attempts by one user from one address.
pub fn login_identifier(username: &str, ip: &str) -> String {
    format!("login_{}_{}", username, ip)
}

/// Identifier for one kind of user action.
pub fn action_identifier(user_id: &str, action: &str) -> String {
    format!("action_{}_{}", user_id, action)
}
