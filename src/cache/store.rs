//! Cache Store Module
//!
//! Bounded TTL cache: HashMap storage, lazy expiry on read, full expiry purge
//! and single-victim eviction on write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::policy::select_victim;
use crate::cache::stats::CacheCounters;
use crate::cache::{CacheEntry, CacheStats, EvictionMode, EvictionPolicy};
use crate::clock::{Clock, Timestamp};

// == Cache Config ==
/// Sizing and timing of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries held before eviction engages
    pub max_size: usize,
    /// Expiry applied when `set` is not given an explicit TTL
    pub default_ttl: Duration,
    /// Named eviction policy
    pub policy: EvictionPolicy,
    /// Whether the policy name is honoured or collapsed to recency
    pub mode: EvictionMode,
}

impl CacheConfig {
    pub fn new(max_size: usize, default_ttl: Duration, policy: EvictionPolicy) -> Self {
        Self {
            max_size,
            default_ttl,
            policy,
            mode: EvictionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: EvictionMode) -> Self {
        self.mode = mode;
        self
    }
}

struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    // Shared by insertion sequence and LRU access order
    next_tick: u64,
    counters: CacheCounters,
}

impl<T> CacheState<T> {
    fn next_tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn purge_expired(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.counters.record_expirations(removed);
        removed
    }
}

// == Cache ==
/// Generic key/value store with per-entry expiry and a capacity-triggered
/// eviction policy.
///
/// All methods take `&self`; the entry map sits behind a single mutex and no
/// method yields while holding it. Misses, expired entries and evicted entries
/// all read back as `None`.
pub struct Cache<T> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> Cache<T> {
    // == Constructor ==
    /// Creates an empty cache. A zero capacity is treated as one.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let config = CacheConfig {
            max_size: config.max_size.max(1),
            ..config
        };

        Self {
            config,
            clock,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_tick: 0,
                counters: CacheCounters::default(),
            }),
        }
    }

    // == Set ==
    /// Stores a value under `key` with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: T) {
        self.set_with_ttl(key, value, self.config.default_ttl);
    }

    /// Stores a value under `key` with an explicit TTL.
    ///
    /// Expired entries are purged first. If the cache is still full and `key`
    /// is new, exactly one entry is evicted per the configured policy.
    /// Overwriting an existing key never evicts, even at capacity: the size
    /// does not grow, so evicting an unrelated entry would only lose data.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        let key = key.into();
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        state.purge_expired(now);

        let is_overwrite = state.entries.contains_key(&key);
        if !is_overwrite && state.entries.len() >= self.config.max_size {
            if let Some(victim) = select_victim(&state.entries, self.config.policy, self.config.mode)
            {
                state.entries.remove(&victim);
                state.counters.record_eviction();
                debug!(key = %victim, policy = %self.config.policy, "Evicted cache entry");
            }
        }

        let sequence = state.next_tick();
        state
            .entries
            .insert(key, CacheEntry::new(value, now, ttl, sequence));
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed on sight. Under LRU a hit refreshes the
    /// entry's insertion time, which also restarts its TTL.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        let Some(expired) = state.entries.get(key).map(|entry| entry.is_expired(now)) else {
            state.counters.record_miss();
            return None;
        };

        if expired {
            state.entries.remove(key);
            state.counters.record_expirations(1);
            state.counters.record_miss();
            return None;
        }

        state.counters.record_hit();
        let access = self
            .config
            .policy
            .refreshes_on_read()
            .then(|| state.next_tick());
        let entry = state.entries.get_mut(key)?;
        entry.hits += 1;
        if let Some(tick) = access {
            entry.inserted_at = now;
            entry.last_access = tick;
        }
        Some(entry.data.clone())
    }

    // == Has ==
    /// Same as `get(key).is_some()`, with the same side effects.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Delete ==
    /// Removes an entry. Returns true if something was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    // == Delete Prefix ==
    /// Removes every entry whose key starts with `prefix`.
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !key.starts_with(prefix));
        before - state.entries.len()
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    // == Size ==
    /// Number of live entries, after purging expired ones.
    pub fn size(&self) -> usize {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.purge_expired(now);
        state.entries.len()
    }

    // == Purge Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        self.state.lock().purge_expired(now)
    }

    // == Stats ==
    /// Returns a snapshot of this cache.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();
        state.purge_expired(now);

        CacheStats::from_parts(
            state.entries.len(),
            self.config.max_size,
            self.config.policy,
            self.config.default_ttl.as_millis() as u64,
            state.counters,
        )
    }

    /// Configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<T> fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("entries", &self.state.lock().entries.len())
            .finish()
    }
}
