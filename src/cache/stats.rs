//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

use crate::cache::EvictionPolicy;

// == Cache Counters ==
/// Running counters kept by a cache between snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of one cache.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Live entries after purging expired ones
    pub size: usize,
    /// Capacity before eviction engages
    pub max_size: usize,
    /// Configured eviction policy
    pub policy: EvictionPolicy,
    /// Default TTL in milliseconds
    #[serde(rename = "defaultTTL")]
    pub default_ttl_ms: u64,
    /// Number of successful reads
    pub hits: u64,
    /// Number of reads that found nothing live
    pub misses: u64,
    /// Entries removed to make room
    pub evictions: u64,
    /// Entries removed because their TTL ran out
    pub expirations: u64,
    /// hits / (hits + misses), 0.0 before any read
    pub hit_rate: f64,
}

impl CacheStats {
    pub(crate) fn from_parts(
        size: usize,
        max_size: usize,
        policy: EvictionPolicy,
        default_ttl_ms: u64,
        counters: CacheCounters,
    ) -> Self {
        let total = counters.hits + counters.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            counters.hits as f64 / total as f64
        };

        Self {
            size,
            max_size,
            policy,
            default_ttl_ms,
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
            hit_rate,
        }
    }
}
