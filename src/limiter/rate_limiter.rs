//! Rate Limiter
//!
//! Per-identifier fixed-window counter with progressive blocking. Each
//! identifier moves through Fresh -> WithinWindow -> LimitExceeded -> Blocked
//! and back to Fresh when its auto-unblock timer fires.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::clock::{Clock, Scheduler, TimerId, Timestamp};
use crate::limiter::{BlockTiers, RateLimitConfig};
use crate::security::{EventKind, SecurityEventLog};

// == Rate Limit Entry ==
/// Request count for one identifier inside its current window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitEntry {
    pub key: String,
    pub count: u32,
    pub window_reset_at: Timestamp,
}

// == Block Record ==
/// An identifier that is refused until `blocked_until`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub identifier: String,
    pub blocked_until: Timestamp,
    #[serde(skip)]
    timer: Option<TimerId>,
    // Distinguishes this block from a later one on the same identifier
    #[serde(skip)]
    generation: u64,
}

impl BlockRecord {
    fn is_active(&self, now: Timestamp) -> bool {
        now < self.blocked_until
    }
}

// == Rate Limit Decision ==
/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// When the current window (or block) ends
    pub reset_time: Timestamp,
    /// Milliseconds the caller should wait before retrying
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

// == Rate Limit Status ==
/// Read-only snapshot for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub identifier: String,
    pub count: u32,
    pub remaining: u32,
    /// None when no window is open
    pub reset_time: Option<Timestamp>,
    pub blocked: bool,
    pub blocked_until: Option<Timestamp>,
}

#[derive(Default)]
struct LimiterState {
    entries: HashMap<String, RateLimitEntry>,
    blocks: HashMap<String, BlockRecord>,
    next_generation: u64,
    // Set on shutdown; later blocks lapse by deadline only
    timers_stopped: bool,
}

// == Rate Limiter ==
/// Sliding-window admission control with escalating blocks.
///
/// Admission failures are ordinary values, never errors. Violations and
/// blocks are appended to the shared [`SecurityEventLog`].
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    timers: Arc<dyn Scheduler>,
    events: Arc<SecurityEventLog>,
    tiers: BlockTiers,
    state: Arc<Mutex<LimiterState>>,
}

impl RateLimiter {
    pub fn new(
        clock: Arc<dyn Clock>,
        timers: Arc<dyn Scheduler>,
        events: Arc<SecurityEventLog>,
        tiers: BlockTiers,
    ) -> Self {
        Self {
            clock,
            timers,
            events,
            tiers,
            state: Arc::new(Mutex::new(LimiterState::default())),
        }
    }

    // == Is Allowed ==
    /// Admission check for one request from `identifier`.
    pub fn is_allowed(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitDecision {
        let now = self.clock.now_ms();
        let max_requests = config.max_requests.max(1);
        let mut state = self.state.lock();

        if let Some(blocked_until) = Self::active_block(&mut state, identifier, now) {
            debug!(identifier, blocked_until, "Request refused, identifier blocked");
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: blocked_until,
                retry_after_ms: Some(blocked_until - now),
            };
        }

        let open_window = state
            .entries
            .get_mut(identifier)
            .filter(|entry| now <= entry.window_reset_at);

        // Fresh identifier or expired window
        let Some(entry) = open_window else {
            let window_reset_at = now.saturating_add(config.window_ms());
            state.entries.insert(
                identifier.to_string(),
                RateLimitEntry {
                    key: identifier.to_string(),
                    count: 1,
                    window_reset_at,
                },
            );
            return RateLimitDecision {
                allowed: true,
                remaining: max_requests - 1,
                reset_time: window_reset_at,
                retry_after_ms: None,
            };
        };

        if entry.count < max_requests {
            entry.count += 1;
            return RateLimitDecision {
                allowed: true,
                remaining: max_requests - entry.count,
                reset_time: entry.window_reset_at,
                retry_after_ms: None,
            };
        }

        // Limit exceeded: rejected requests still count toward violations
        entry.count = entry.count.saturating_add(1);
        let count = entry.count;
        let window_reset_at = entry.window_reset_at;
        let violations = count / max_requests;

        self.events.record_with(
            EventKind::RateLimitExceeded,
            identifier,
            json!({
                "count": count,
                "maxRequests": max_requests,
                "windowMs": config.window_ms(),
                "violations": violations,
            }),
        );

        if let Some(duration) = self.tiers.duration_for(violations) {
            self.block_locked(&mut state, identifier, duration, now);
            self.events.record_with(
                EventKind::BlockedIp,
                identifier,
                json!({
                    "reason": "progressive",
                    "violations": violations,
                    "durationMs": duration.as_millis() as u64,
                }),
            );
        }

        RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_time: window_reset_at,
            retry_after_ms: Some(window_reset_at.saturating_sub(now)),
        }
    }

    // == Record Request ==
    /// Post-hoc bookkeeping once the guarded operation has finished.
    ///
    /// Hands the request back to the window budget when the config says
    /// requests with this outcome should not count. Never evaluates admission.
    pub fn record_request(&self, identifier: &str, success: bool, config: &RateLimitConfig) {
        let skip = if success {
            config.skip_successful_requests
        } else {
            config.skip_failed_requests
        };
        if !skip {
            return;
        }

        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(identifier) {
            if now <= entry.window_reset_at {
                entry.count = entry.count.saturating_sub(1);
                debug!(identifier, success, count = entry.count, "Request not counted");
            }
        }
    }

    // == Block Identifier ==
    /// Blocks `identifier` for `duration`, replacing any existing block.
    /// Returns the time the block lapses.
    pub fn block_identifier(&self, identifier: &str, duration: Duration) -> Timestamp {
        let now = self.clock.now_ms();
        let blocked_until = {
            let mut state = self.state.lock();
            self.block_locked(&mut state, identifier, duration, now)
        };
        self.events.record_with(
            EventKind::BlockedIp,
            identifier,
            json!({
                "reason": "manual",
                "durationMs": duration.as_millis() as u64,
            }),
        );
        blocked_until
    }

    // == Unblock Identifier ==
    /// Lifts a block and cancels its pending timer. Returns false if the
    /// identifier was not blocked.
    pub fn unblock_identifier(&self, identifier: &str) -> bool {
        let record = self.state.lock().blocks.remove(identifier);
        match record {
            Some(record) => {
                if let Some(timer) = record.timer {
                    self.timers.cancel(timer);
                }
                info!(identifier, "Identifier unblocked");
                true
            }
            None => false,
        }
    }

    // == Is Blocked ==
    pub fn is_blocked(&self, identifier: &str) -> bool {
        let now = self.clock.now_ms();
        Self::active_block(&mut self.state.lock(), identifier, now).is_some()
    }

    // == Get Status ==
    /// Current count, remaining budget and block state, without mutating.
    pub fn get_status(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitStatus {
        let now = self.clock.now_ms();
        let max_requests = config.max_requests.max(1);
        let state = self.state.lock();

        let window = state
            .entries
            .get(identifier)
            .filter(|entry| now <= entry.window_reset_at);
        let count = window.map_or(0, |entry| entry.count);
        let blocked_until = state
            .blocks
            .get(identifier)
            .filter(|record| record.is_active(now))
            .map(|record| record.blocked_until);

        RateLimitStatus {
            identifier: identifier.to_string(),
            count,
            remaining: max_requests.saturating_sub(count),
            reset_time: window.map(|entry| entry.window_reset_at),
            blocked: blocked_until.is_some(),
            blocked_until,
        }
    }

    /// Returns `identifier` to Fresh, e.g. after a successful login: the
    /// window is dropped and any block is lifted with its timer cancelled.
    pub fn reset(&self, identifier: &str) -> bool {
        let (entry, block) = {
            let mut state = self.state.lock();
            (
                state.entries.remove(identifier),
                state.blocks.remove(identifier),
            )
        };
        if let Some(timer) = block.as_ref().and_then(|record| record.timer) {
            self.timers.cancel(timer);
        }
        entry.is_some() || block.is_some()
    }

    // == Blocked Identifiers ==
    /// Blocks that are still in force.
    pub fn blocked_identifiers(&self) -> Vec<BlockRecord> {
        let now = self.clock.now_ms();
        let mut blocks: Vec<BlockRecord> = self
            .state
            .lock()
            .blocks
            .values()
            .filter(|record| record.is_active(now))
            .cloned()
            .collect();
        blocks.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        blocks
    }

    pub fn blocked_count(&self) -> usize {
        let now = self.clock.now_ms();
        self.state
            .lock()
            .blocks
            .values()
            .filter(|record| record.is_active(now))
            .count()
    }

    // == Cleanup Expired ==
    /// Drops closed windows and lapsed blocks, returning how many records
    /// were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        let before = state.entries.len() + state.blocks.len();
        state.entries.retain(|_, entry| now <= entry.window_reset_at);
        state.blocks.retain(|_, record| record.is_active(now));
        before - (state.entries.len() + state.blocks.len())
    }

    /// Stops scheduling auto-unblock timers. Blocks created afterwards are
    /// still enforced and lapse on read at their deadline.
    pub fn stop_timers(&self) {
        self.state.lock().timers_stopped = true;
    }

    /// Number of identifiers with an open or stale window record.
    pub fn tracked_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    // Returns the block deadline if `identifier` is blocked. A lapsed record
    // whose timer never fired is handled as if it had: the identifier is
    // unblocked and starts fresh.
    fn active_block(state: &mut LimiterState, identifier: &str, now: Timestamp) -> Option<Timestamp> {
        let record = state.blocks.get(identifier)?;
        if record.is_active(now) {
            return Some(record.blocked_until);
        }
        state.blocks.remove(identifier);
        state.entries.remove(identifier);
        None
    }

    fn block_locked(
        &self,
        state: &mut LimiterState,
        identifier: &str,
        duration: Duration,
        now: Timestamp,
    ) -> Timestamp {
        if let Some(previous) = state.blocks.remove(identifier) {
            if let Some(timer) = previous.timer {
                self.timers.cancel(timer);
            }
        }

        let delay_ms = duration.as_millis() as u64;
        let generation = state.next_generation;
        state.next_generation += 1;

        let timer = (!state.timers_stopped).then(|| {
            self.timers.schedule(
                delay_ms,
                unblock_callback(Arc::downgrade(&self.state), identifier.to_string(), generation),
            )
        });

        let blocked_until = now.saturating_add(delay_ms);
        state.blocks.insert(
            identifier.to_string(),
            BlockRecord {
                identifier: identifier.to_string(),
                blocked_until,
                timer,
                generation,
            },
        );

        warn!(identifier, duration_ms = delay_ms, blocked_until, "Identifier blocked");
        blocked_until
    }
}

// Only removes the block this timer was created for; a later block on the
// same identifier carries a different generation.
fn unblock_callback(
    state: Weak<Mutex<LimiterState>>,
    identifier: String,
    generation: u64,
) -> Box<dyn FnOnce() + Send + 'static> {
    Box::new(move || {
        let Some(state) = state.upgrade() else {
            return;
        };
        let mut state = state.lock();
        let owned = state
            .blocks
            .get(&identifier)
            .is_some_and(|record| record.generation == generation);
        if owned {
            state.blocks.remove(&identifier);
            state.entries.remove(&identifier);
            info!(identifier = %identifier, "Block expired, identifier unblocked");
        }
    })
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RateLimiter")
            .field("tiers", &self.tiers)
            .field("tracked", &state.entries.len())
            .field("blocked", &state.blocks.len())
            .finish()
    }
}
