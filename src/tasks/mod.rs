//! Background Tasks Module
//!
//! Time-driven side effects of the subsystem.
//!
//! # Tasks
//! - Timers: tokio-backed [`Scheduler`](crate::clock::Scheduler) for auto-unblock callbacks
//! - Cleanup: periodic sweep of expired cache entries, rate-limit records and old events

mod cleanup;
mod timers;

pub use cleanup::spawn_cleanup_task;
pub use timers::TokioTimers;
