//! Security Module
//!
//! Bounded log of rate-limit violations, blocks and authorization failures.

mod event;
mod event_log;

pub use event::{EventKind, SecurityEvent, Severity};
pub use event_log::{EventQuery, EventStats, SecurityEventLog, DEFAULT_MAX_EVENTS, STATS_WINDOW};
