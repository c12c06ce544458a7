//! Security Event Log
//!
//! Append-only ring of security events with on-demand statistics.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::clock::{Clock, Timestamp};
use crate::security::{EventKind, SecurityEvent, Severity};

/// Default capacity of the ring.
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Rolling window used by [`EventStats`].
pub const STATS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

// == Event Query ==
/// Filter for [`SecurityEventLog::query`]. Unset fields match everything;
/// the time range is inclusive on both ends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub kind: Option<EventKind>,
    pub identifier: Option<String>,
}

impl EventQuery {
    pub fn between(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    fn matches(&self, event: &SecurityEvent) -> bool {
        self.start.map_or(true, |start| event.timestamp >= start)
            && self.end.map_or(true, |end| event.timestamp <= end)
            && self.kind.map_or(true, |kind| event.kind == kind)
            && self
                .identifier
                .as_deref()
                .map_or(true, |id| event.identifier == id)
    }
}

// == Event Stats ==
/// Counts over the log. Severity counts cover the last 24 hours only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub total_events: usize,
    pub critical_events: usize,
    pub high_events: usize,
    pub medium_events: usize,
    pub low_events: usize,
    #[serde(rename = "last24h")]
    pub last_24h: usize,
}

// == Security Event Log ==
/// Bounded, append-only event record. The oldest event is dropped first when
/// the ring is full.
pub struct SecurityEventLog {
    max_events: usize,
    clock: Arc<dyn Clock>,
    events: Mutex<VecDeque<SecurityEvent>>,
}

impl SecurityEventLog {
    /// Creates a log holding at most `max_events` events (at least one).
    pub fn new(max_events: usize, clock: Arc<dyn Clock>) -> Self {
        let max_events = max_events.max(1);
        Self {
            max_events,
            clock,
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
        }
    }

    // == Record ==
    /// Appends an event stamped with the current time.
    pub fn record(&self, kind: EventKind, identifier: &str, metadata: Map<String, Value>) {
        let event = SecurityEvent::new(kind, identifier, self.clock.now_ms(), metadata);

        match event.severity {
            Severity::Low | Severity::Medium => info!("SECURITY: {}", event.format()),
            Severity::High => warn!("SECURITY: {}", event.format()),
            Severity::Critical => error!("SECURITY: {}", event.format()),
        }

        let mut events = self.events.lock();
        while events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Appends an event with any serializable metadata.
    ///
    /// Objects become the metadata map, other values are stored under
    /// `"value"`. Metadata that cannot be serialized is replaced by a
    /// `metadata_error` note; the event itself is always recorded.
    pub fn record_with<M: Serialize>(&self, kind: EventKind, identifier: &str, metadata: M) {
        let metadata = match serde_json::to_value(metadata) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) => Map::new(),
            Ok(other) => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
            Err(e) => {
                warn!(kind = %kind, identifier, error = %e, "Dropping unserializable event metadata");
                let mut map = Map::new();
                map.insert("metadata_error".to_string(), Value::String(e.to_string()));
                map
            }
        };

        self.record(kind, identifier, metadata);
    }

    // == Query ==
    /// Events matching `query`, oldest first.
    pub fn query(&self, query: &EventQuery) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| query.matches(event))
            .cloned()
            .collect()
    }

    /// The newest `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    // == Stats ==
    /// Computes counts on demand; nothing is tracked incrementally.
    pub fn stats(&self) -> EventStats {
        let now = self.clock.now_ms();
        let cutoff = now.saturating_sub(STATS_WINDOW.as_millis() as u64);
        let events = self.events.lock();

        let mut stats = EventStats {
            total_events: events.len(),
            ..Default::default()
        };

        for event in events.iter().filter(|event| event.timestamp >= cutoff) {
            stats.last_24h += 1;
            match event.severity {
                Severity::Critical => stats.critical_events += 1,
                Severity::High => stats.high_events += 1,
                Severity::Medium => stats.medium_events += 1,
                Severity::Low => stats.low_events += 1,
            }
        }

        stats
    }

    // == Cleanup Old ==
    /// Removes events older than `max_age`, returning how many were dropped.
    pub fn cleanup_old(&self, max_age: Duration) -> usize {
        let cutoff = self
            .clock
            .now_ms()
            .saturating_sub(max_age.as_millis() as u64);
        let mut events = self.events.lock();
        let before = events.len();
        events.retain(|event| event.timestamp >= cutoff);
        before - events.len()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }
}

impl fmt::Debug for SecurityEventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityEventLog")
            .field("max_events", &self.max_events)
            .field("len", &self.len())
            .finish()
    }
}
