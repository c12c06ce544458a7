//! Clock and Timer Source
//!
//! Abstraction over wall-clock time and delayed callbacks. Every time-sensitive
//! component reads "now" through [`Clock`] and schedules deferred work through
//! [`Scheduler`], so tests can drive time by hand with [`ManualClock`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Unix timestamp in milliseconds.
pub type Timestamp = u64;

/// Callback run when a scheduled timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

// == Timer Id ==
/// Handle identifying one scheduled timer; used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

// == Clock ==
/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current Unix timestamp in milliseconds.
    fn now_ms(&self) -> Timestamp;
}

// == Scheduler ==
/// Source of delayed callbacks with cancellation handles.
///
/// Implementations keep every pending timer in an arena keyed by [`TimerId`],
/// so `cancel_all` can deterministically drop all of them on shutdown.
pub trait Scheduler: Send + Sync {
    /// Runs `callback` once after `delay_ms` milliseconds.
    fn schedule(&self, delay_ms: u64, callback: TimerCallback) -> TimerId;

    /// Cancels a pending timer. Returns false if it already fired or was unknown.
    fn cancel(&self, id: TimerId) -> bool;

    /// Cancels every pending timer, returning how many were dropped.
    fn cancel_all(&self) -> usize;

    /// Number of timers that have not fired yet.
    fn pending(&self) -> usize;
}

// == System Clock ==
/// Wall clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        // A clock set before the epoch reads as zero rather than panicking
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

// == Manual Clock ==
/// Hand-driven clock that is also a [`Scheduler`].
///
/// Time only moves on [`ManualClock::advance`] or [`ManualClock::set`]; timers
/// whose deadline has been reached fire during that call, in deadline order.
pub struct ManualClock {
    now: AtomicU64,
    next_id: AtomicU64,
    // Keyed by (deadline, id) so iteration order is firing order
    timers: Mutex<BTreeMap<(Timestamp, TimerId), TimerCallback>>,
}

impl ManualClock {
    /// Creates a clock starting at `start_ms`.
    pub fn new(start_ms: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
            next_id: AtomicU64::new(1),
            timers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Moves time forward by `delta_ms` and fires due timers.
    pub fn advance(&self, delta_ms: u64) {
        let target = self.now.load(Ordering::SeqCst) + delta_ms;
        self.set(target);
    }

    /// Jumps to an absolute time. Moving backwards never fires timers.
    pub fn set(&self, target_ms: Timestamp) {
        loop {
            // Pop one due timer at a time so a callback may schedule new timers
            let due = {
                let mut timers = self.timers.lock();
                let first = timers.keys().next().copied();
                match first {
                    Some(key) if key.0 <= target_ms => {
                        timers.remove(&key).map(|cb| (key.0, cb))
                    }
                    _ => None,
                }
            };

            match due {
                Some((deadline, callback)) => {
                    self.now.fetch_max(deadline, Ordering::SeqCst);
                    callback();
                }
                None => break,
            }
        }
        self.now.store(target_ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("now", &self.now.load(Ordering::SeqCst))
            .field("pending", &self.timers.lock().len())
            .finish()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

impl Scheduler for ManualClock {
    fn schedule(&self, delay_ms: u64, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let deadline = self.now_ms().saturating_add(delay_ms);
        self.timers.lock().insert((deadline, id), callback);
        id
    }

    fn cancel(&self, id: TimerId) -> bool {
        let mut timers = self.timers.lock();
        let key = timers.keys().find(|(_, timer)| *timer == id).copied();
        match key {
            Some(key) => timers.remove(&key).is_some(),
            None => false,
        }
    }

    fn cancel_all(&self) -> usize {
        let mut timers = self.timers.lock();
        let count = timers.len();
        timers.clear();
        count
    }

    fn pending(&self) -> usize {
        self.timers.lock().len()
    }
}
