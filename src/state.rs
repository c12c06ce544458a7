//! Temporal State Subsystem
//!
//! The explicitly constructed owner of the cache registry, rate limiter and
//! security event log. Callers receive it by reference (or `Arc`) instead of
//! reaching for a process-wide singleton, so tests build isolated instances.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::cache::CacheRegistry;
use crate::clock::{Clock, Scheduler, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::security::{EventStats, SecurityEventLog};
use crate::tasks::TokioTimers;

// == Security Stats ==
/// Event counts plus the number of identifiers currently blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityStats {
    #[serde(flatten)]
    pub events: EventStats,
    #[serde(rename = "blockedIdentifierCount")]
    pub blocked_identifiers: usize,
}

// == Cleanup Report ==
/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub cache_entries: usize,
    pub rate_limit_records: usize,
    pub events: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.cache_entries + self.rate_limit_records + self.events
    }
}

// == Temporal State ==
pub struct TemporalState {
    timers: Arc<dyn Scheduler>,
    caches: CacheRegistry,
    limiter: RateLimiter,
    events: Arc<SecurityEventLog>,
    event_max_age: Duration,
}

impl TemporalState {
    /// Builds the subsystem on an explicit clock and timer source.
    pub fn new(config: &Config, clock: Arc<dyn Clock>, timers: Arc<dyn Scheduler>) -> Self {
        let events = Arc::new(SecurityEventLog::new(config.max_events, clock.clone()));
        let caches = CacheRegistry::new(&config.cache_domains, config.eviction_mode, clock.clone());
        let limiter = RateLimiter::new(
            clock,
            timers.clone(),
            events.clone(),
            config.block_tiers.clone(),
        );

        Self {
            timers,
            caches,
            limiter,
            events,
            event_max_age: config.event_max_age(),
        }
    }

    /// Builds the subsystem on the wall clock and the current tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timers = TokioTimers::current()?;
        Ok(Self::new(config, Arc::new(SystemClock), Arc::new(timers)))
    }

    pub fn caches(&self) -> &CacheRegistry {
        &self.caches
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn events(&self) -> &SecurityEventLog {
        &self.events
    }

    // == Security Stats ==
    pub fn security_stats(&self) -> SecurityStats {
        SecurityStats {
            events: self.events.stats(),
            blocked_identifiers: self.limiter.blocked_count(),
        }
    }

    // == Cleanup ==
    /// One sweep over every component.
    pub fn cleanup(&self) -> CleanupReport {
        CleanupReport {
            cache_entries: self.caches.purge_expired(),
            rate_limit_records: self.limiter.cleanup_expired(),
            events: self.events.cleanup_old(self.event_max_age),
        }
    }

    // == Shutdown ==
    /// Cancels every pending timer and stops the limiter from scheduling new
    /// ones. Blocks keep their deadlines and lapse on read; no callback runs
    /// after this returns.
    pub fn shutdown(&self) -> usize {
        self.limiter.stop_timers();
        let cancelled = self.timers.cancel_all();
        info!(cancelled, "Temporal state shut down");
        cancelled
    }
}

impl fmt::Debug for TemporalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporalState")
            .field("caches", &self.caches)
            .field("limiter", &self.limiter)
            .field("events", &self.events)
            .finish()
    }
}
