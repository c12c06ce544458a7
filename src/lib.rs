//! Temporal State - in-process caching, rate limiting and security event
//! logging for a web backend
//!
//! Named TTL caches with pluggable eviction, fixed-window admission control
//! with progressive blocking, and a bounded security event log, all driven
//! by an injectable clock and owned by one explicitly constructed
//! [`TemporalState`].

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod limiter;
pub mod models;
pub mod security;
pub mod state;
pub mod tasks;

pub use api::AppState;
pub use clock::{Clock, ManualClock, Scheduler, SystemClock};
pub use config::Config;
pub use error::{Result, StateError};
pub use state::{CleanupReport, SecurityStats, TemporalState};
pub use tasks::{spawn_cleanup_task, TokioTimers};
