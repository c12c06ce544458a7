//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use crate::clock::Timestamp;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored value
    pub data: T,
    /// Insertion timestamp (Unix milliseconds). Refreshed on read under LRU.
    pub inserted_at: Timestamp,
    /// Time to live in milliseconds, measured from `inserted_at`
    pub ttl_ms: u64,
    /// Monotonic insertion number within the owning cache
    pub sequence: u64,
    /// Cache-wide tick of the last write, or of the last LRU read
    pub last_access: u64,
    /// Number of successful reads since insertion
    pub hits: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `data` - The value to store
    /// * `now` - Insertion time
    /// * `ttl` - How long the entry stays live
    /// * `sequence` - Insertion order assigned by the cache
    pub fn new(data: T, now: Timestamp, ttl: Duration, sequence: u64) -> Self {
        Self {
            data,
            inserted_at: now,
            ttl_ms: ttl.as_millis() as u64,
            sequence,
            last_access: sequence,
            hits: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: the entry is still live when exactly `ttl` has
    /// elapsed and expires strictly after that.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.saturating_sub(self.inserted_at) > self.ttl_ms
    }

    // == Expires At ==
    /// Last instant at which the entry is still live.
    pub fn expires_at(&self) -> Timestamp {
        self.inserted_at.saturating_add(self.ttl_ms)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or 0 if expired.
    pub fn ttl_remaining_ms(&self, now: Timestamp) -> u64 {
        self.expires_at().saturating_sub(now)
    }
}
