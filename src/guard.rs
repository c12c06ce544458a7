//! Guard Wrappers
//!
//! Higher-order functions applied at the call site around sensitive
//! operations: admission control, security event recording on failure, and
//! slow-call logging.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{debug, warn};

use crate::error::StateError;
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::security::{EventKind, SecurityEventLog};

fn admit(limiter: &RateLimiter, identifier: &str, config: &RateLimitConfig) -> Result<(), StateError> {
    let decision = limiter.is_allowed(identifier, config);
    if decision.allowed {
        Ok(())
    } else {
        Err(StateError::RateLimited {
            retry_after_ms: decision.retry_after_ms.unwrap_or(0),
        })
    }
}

// == With Rate Limit ==
/// Runs `op` only if `identifier` is admitted, then reports its outcome back
/// to the limiter.
///
/// A refused call returns [`StateError::RateLimited`] converted into the
/// operation's own error type, without running `op`.
pub fn with_rate_limit<T, E, F>(
    limiter: &RateLimiter,
    identifier: &str,
    config: &RateLimitConfig,
    op: F,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<StateError>,
{
    admit(limiter, identifier, config)?;
    let result = op();
    limiter.record_request(identifier, result.is_ok(), config);
    result
}

/// Async form of [`with_rate_limit`]. The admission check itself never awaits.
pub async fn with_rate_limit_async<T, E, F, Fut>(
    limiter: &RateLimiter,
    identifier: &str,
    config: &RateLimitConfig,
    op: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<StateError>,
{
    admit(limiter, identifier, config)?;
    let result = op().await;
    limiter.record_request(identifier, result.is_ok(), config);
    result
}

// == Monitor Security ==
/// Runs `op` and records a `kind` event against `identifier` if it fails.
/// The result is returned untouched.
pub fn monitor_security<T, E, F>(
    events: &SecurityEventLog,
    kind: EventKind,
    identifier: &str,
    op: F,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    let result = op();
    if let Err(e) = &result {
        events.record_with(kind, identifier, json!({ "error": e.to_string() }));
    }
    result
}

// == Monitor Performance ==
/// Times `op`, logging at debug level and warning when it takes longer than
/// `slow_threshold`.
pub fn monitor_performance<T, F>(name: &str, slow_threshold: Duration, op: F) -> T
where
    F: FnOnce() -> T,
{
    let started = Instant::now();
    let result = op();
    let elapsed = started.elapsed();

    if elapsed > slow_threshold {
        warn!(operation = name, elapsed_ms = elapsed.as_millis() as u64, "Slow operation");
    } else {
        debug!(operation = name, elapsed_us = elapsed.as_micros() as u64, "Operation timed");
    }
    result
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::limiter::BlockTiers;
    use crate::security::EventQuery;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum LoginError {
        BadPassword,
        Limited(u64),
    }

    impl Display for LoginError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl From<StateError> for LoginError {
        fn from(e: StateError) -> Self {
            match e {
                StateError::RateLimited { retry_after_ms } => LoginError::Limited(retry_after_ms),
                _ => LoginError::BadPassword,
            }
        }
    }

    fn setup() -> (Arc<ManualClock>, Arc<SecurityEventLog>, RateLimiter) {
        let clock = Arc::new(ManualClock::new(0));
        let events = Arc::new(SecurityEventLog::new(100, clock.clone()));
        let limiter = RateLimiter::new(
            clock.clone(),
            clock.clone(),
            events.clone(),
            BlockTiers::default(),
        );
        (clock, events, limiter)
    }

    #[test]
    fn test_with_rate_limit_refuses_without_running() {
        let (_clock, _events, limiter) = setup();
        let config = RateLimitConfig::new(Duration::from_secs(60), 2);
        let mut runs = 0;

        for _ in 0..2 {
            let result: Result<(), LoginError> = with_rate_limit(&limiter, "k", &config, || {
                runs += 1;
                Err(LoginError::BadPassword)
            });
            assert_eq!(result, Err(LoginError::BadPassword));
        }

        let result: Result<(), LoginError> = with_rate_limit(&limiter, "k", &config, || {
            runs += 1;
            Ok(())
        });
        assert_eq!(result, Err(LoginError::Limited(60_000)));
        assert_eq!(runs, 2);
    }

    #[test]
    fn test_with_rate_limit_hands_back_successes() {
        let (_clock, _events, limiter) = setup();
        let config = RateLimitConfig::AUTH.skip_successful(true);

        for _ in 0..20 {
            let result: Result<u32, LoginError> =
                with_rate_limit(&limiter, "login_bob_1.1.1.1", &config, || Ok(7));
            assert_eq!(result, Ok(7));
        }
    }

    #[tokio::test]
    async fn test_with_rate_limit_async() {
        let (_clock, _events, limiter) = setup();
        let config = RateLimitConfig::new(Duration::from_secs(60), 1);

        let first: Result<&str, LoginError> =
            with_rate_limit_async(&limiter, "k", &config, || async { Ok("done") }).await;
        assert_eq!(first, Ok("done"));

        let second: Result<&str, LoginError> =
            with_rate_limit_async(&limiter, "k", &config, || async { Ok("done") }).await;
        assert!(matches!(second, Err(LoginError::Limited(_))));
    }

    #[test]
    fn test_monitor_security_records_failures_only() {
        let (_clock, events, _limiter) = setup();

        let ok: Result<u8, LoginError> =
            monitor_security(&events, EventKind::AuthorizationViolation, "u1", || Ok(1));
        assert_eq!(ok, Ok(1));
        assert!(events.is_empty());

        let err: Result<u8, LoginError> =
            monitor_security(&events, EventKind::AuthorizationViolation, "u1", || {
                Err(LoginError::BadPassword)
            });
        assert_eq!(err, Err(LoginError::BadPassword));

        let recorded = events.query(&EventQuery::default());
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].kind, EventKind::AuthorizationViolation);
        assert_eq!(recorded[0].metadata["error"], "BadPassword");
    }

    #[test]
    fn test_monitor_performance_returns_value() {
        let value = monitor_performance("sum", Duration::from_secs(1), || 2 + 2);
        assert_eq!(value, 4);
    }
}
