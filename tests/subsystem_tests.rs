//! Subsystem Tests
//!
//! Exercises the public library API end to end: caches, limiter, event log
//! and guards sharing one manually driven clock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map};
use temporal_state::{
    cache::{Cache, CacheConfig, EvictionPolicy, ATTACHMENTS, STATS, TRANSACTIONS, USER_DATA},
    guard::{monitor_security, with_rate_limit},
    limiter::{login_identifier, RateLimitConfig},
    security::{EventKind, EventQuery},
    Clock, Config, ManualClock, Scheduler, StateError, TemporalState,
};
use tokio_test::{assert_err, assert_ok};

const MINUTE_MS: u64 = 60 * 1000;
const DAY_MS: u64 = 24 * 60 * MINUTE_MS;

fn subsystem() -> (Arc<ManualClock>, TemporalState) {
    let clock = Arc::new(ManualClock::new(DAY_MS));
    let state = TemporalState::new(&Config::default(), clock.clone(), clock.clone());
    (clock, state)
}

// == Cache ==

#[test]
fn test_ttl_expiry_boundary() {
    let clock = Arc::new(ManualClock::new(0));
    let cache: Cache<&str> = Cache::new(
        CacheConfig::new(10, Duration::from_secs(60), EvictionPolicy::Fifo),
        clock.clone(),
    );

    cache.set_with_ttl("k", "v", Duration::from_millis(500));
    clock.advance(499);
    assert_eq!(cache.get("k"), Some("v"));
    clock.advance(2);
    assert_eq!(cache.get("k"), None);
}

#[test]
fn test_recency_eviction_scenario() {
    let clock = Arc::new(ManualClock::new(0));
    let cache: Cache<u32> = Cache::new(
        CacheConfig::new(2, Duration::from_secs(60), EvictionPolicy::Lru),
        clock.clone(),
    );

    cache.set("A", 1);
    clock.advance(1);
    cache.set("B", 2);
    clock.advance(1);
    assert_eq!(cache.get("A"), Some(1));
    clock.advance(1);
    cache.set("C", 3);

    assert_eq!(cache.get("A"), Some(1));
    assert_eq!(cache.get("C"), Some(3));
    assert_eq!(cache.get("B"), None);
}

#[test]
fn test_clear_all_empties_every_domain() {
    let (_clock, state) = subsystem();
    let caches = state.caches();

    for name in [TRANSACTIONS, USER_DATA, STATS, ATTACHMENTS] {
        caches.get(name).unwrap().set("shared", json!(name));
    }
    caches.clear_all();

    for name in [TRANSACTIONS, USER_DATA, STATS, ATTACHMENTS] {
        assert_eq!(caches.get(name).unwrap().get("shared"), None);
    }
}

#[test]
fn test_unknown_domain_fails_fast() {
    let (_clock, state) = subsystem();
    let err = assert_err!(state.caches().get("ledger"));
    assert!(matches!(err, StateError::UnknownCache(name) if name == "ledger"));
}

// == Rate Limiter ==

#[test]
fn test_window_admission_and_reset() {
    let (clock, state) = subsystem();
    let limiter = state.limiter();
    let config = RateLimitConfig::new(Duration::from_millis(1000), 3);

    for _ in 0..3 {
        assert!(limiter.is_allowed("k", &config).allowed);
    }
    let refused = limiter.is_allowed("k", &config);
    assert!(!refused.allowed);
    assert!(refused.retry_after_ms.unwrap() > 0);

    clock.advance(1001);
    assert!(limiter.is_allowed("k", &config).allowed);
}

#[test]
fn test_progressive_block_escalates() {
    let (clock, state) = subsystem();
    let limiter = state.limiter();
    let config = RateLimitConfig::new(Duration::from_secs(60 * 60), 5);

    // count 10 => two violations => 5 minute block
    for _ in 0..10 {
        limiter.is_allowed("k", &config);
    }
    let status = limiter.get_status("k", &config);
    assert!(status.blocked);
    assert_eq!(status.blocked_until, Some(clock.now_ms() + 5 * MINUTE_MS));

    // Window state is irrelevant while blocked
    clock.advance(MINUTE_MS);
    assert!(!limiter.is_allowed("k", &config).allowed);
    assert_eq!(limiter.get_status("k", &config).count, 10);

    // Manual unblock keeps the count, so further violations escalate
    for _ in 0..10 {
        limiter.unblock_identifier("k");
        assert!(!limiter.is_allowed("k", &config).allowed);
    }
    let status = limiter.get_status("k", &config);
    assert_eq!(status.count, 20);
    assert_eq!(status.blocked_until, Some(clock.now_ms() + 15 * MINUTE_MS));
}

#[test]
fn test_block_timer_returns_identifier_to_fresh() {
    let (clock, state) = subsystem();
    let limiter = state.limiter();
    let config = RateLimitConfig::new(Duration::from_secs(60 * 60), 1);

    // A budget of one turns the first refusal into two violations
    assert!(limiter.is_allowed("k", &config).allowed);
    assert!(!limiter.is_allowed("k", &config).allowed);
    assert!(limiter.is_blocked("k"));
    assert_eq!(clock.pending(), 1);

    clock.advance(5 * MINUTE_MS);
    assert!(!limiter.is_blocked("k"));
    assert_eq!(clock.pending(), 0);

    let decision = limiter.is_allowed("k", &config);
    assert!(decision.allowed);
    assert_eq!(decision.remaining, 0);
}

#[test]
fn test_shutdown_cancels_all_timers() {
    let (clock, state) = subsystem();
    for id in ["a", "b", "c"] {
        state.limiter().block_identifier(id, Duration::from_secs(60));
    }
    assert_eq!(clock.pending(), 3);

    assert_eq!(state.shutdown(), 3);
    assert_eq!(clock.pending(), 0);
}

// == Security Event Log ==

#[test]
fn test_security_stats_window() {
    let (clock, state) = subsystem();
    let events = state.events();

    for _ in 0..3 {
        events.record(EventKind::DataExposure, "old", Map::new());
    }
    clock.advance(DAY_MS + 1);
    for _ in 0..2 {
        events.record(EventKind::DataExposure, "new", Map::new());
    }

    let stats = state.security_stats();
    assert_eq!(stats.events.total_events, 5);
    assert_eq!(stats.events.critical_events, 2);
    assert_eq!(stats.events.last_24h, 2);
}

#[test]
fn test_cleanup_drops_old_events() {
    let (clock, state) = subsystem();
    state
        .events()
        .record(EventKind::SuspiciousActivity, "x", Map::new());
    clock.advance(8 * DAY_MS);
    state
        .events()
        .record(EventKind::SuspiciousActivity, "y", Map::new());

    let report = state.cleanup();
    assert_eq!(report.events, 1);

    let remaining = state.events().query(&EventQuery::default());
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].identifier, "y");
}

// == Guards ==

#[derive(Debug)]
enum LoginError {
    BadCredentials,
    TooManyAttempts(String),
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginError::BadCredentials => write!(f, "bad credentials"),
            LoginError::TooManyAttempts(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<StateError> for LoginError {
    fn from(e: StateError) -> Self {
        LoginError::TooManyAttempts(e.to_string())
    }
}

fn login(state: &TemporalState, user: &str, ip: &str, password: &str) -> Result<String, LoginError> {
    let identifier = login_identifier(user, ip);
    let config = RateLimitConfig::AUTH.skip_successful(true);
    with_rate_limit(state.limiter(), &identifier, &config, || {
        monitor_security(
            state.events(),
            EventKind::AuthenticationFailure,
            &identifier,
            || {
                if password == "hunter2" {
                    Ok(format!("session-{}", user))
                } else {
                    Err(LoginError::BadCredentials)
                }
            },
        )
    })
}

#[test]
fn test_login_flow_locks_out_after_failures() {
    let (_clock, state) = subsystem();

    assert_ok!(login(&state, "bob", "10.0.0.1", "hunter2"));
    for _ in 0..5 {
        assert!(matches!(
            login(&state, "bob", "10.0.0.1", "wrong"),
            Err(LoginError::BadCredentials)
        ));
    }

    let err = assert_err!(login(&state, "bob", "10.0.0.1", "hunter2"));
    assert_eq!(err.to_string(), "Too many attempts, retry in 900 seconds");

    // Other sources for the same user are unaffected
    assert_ok!(login(&state, "bob", "10.0.0.2", "hunter2"));

    let failures = state.events().query(&EventQuery {
        kind: Some(EventKind::AuthenticationFailure),
        ..Default::default()
    });
    assert_eq!(failures.len(), 5);
}
