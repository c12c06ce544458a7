//! Periodic Cleanup Task
//!
//! Background task that sweeps expired cache entries, closed rate-limit
//! windows, lapsed blocks and security events past their retention age.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::TemporalState;

/// Spawns a background task that periodically calls
/// [`TemporalState::cleanup`].
///
/// The task runs in an infinite loop, sleeping for `interval` between
/// sweeps. Abort the returned handle on shutdown.
///
/// # Example
/// ```ignore
/// let state = Arc::new(TemporalState::from_config(&config)?);
/// let cleanup_handle = spawn_cleanup_task(state.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(state: Arc<TemporalState>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cleanup task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            let report = state.cleanup();

            if report.total() > 0 {
                info!(
                    cache_entries = report.cache_entries,
                    rate_limit_records = report.rate_limit_records,
                    events = report.events,
                    "Cleanup removed expired state"
                );
            } else {
                debug!("Cleanup: nothing expired");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::STATS;
    use crate::clock::{Clock, Scheduler, SystemClock};
    use crate::config::Config;
    use crate::limiter::RateLimitConfig;
    use crate::tasks::TokioTimers;
    use serde_json::json;

    fn state() -> Arc<TemporalState> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let timers: Arc<dyn Scheduler> = Arc::new(TokioTimers::current().unwrap());
        Arc::new(TemporalState::new(&Config::default(), clock, timers))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_state() {
        let state = state();
        let cache = state.caches().get(STATS).unwrap();
        cache.set_with_ttl("expire_soon", json!(1), Duration::from_millis(50));
        cache.set_with_ttl("long_lived", json!(2), Duration::from_secs(3600));

        let window = RateLimitConfig::new(Duration::from_millis(50), 10);
        state.limiter().is_allowed("short_window", &window);
        assert_eq!(state.limiter().tracked_count(), 1);

        let handle = spawn_cleanup_task(state.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(350)).await;

        // The limiter never purges on read, so only the sweep can empty it
        assert_eq!(state.limiter().tracked_count(), 0);
        assert!(cache.has("long_lived"));
        assert!(!cache.has("expire_soon"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(state(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
