//! Eviction Policy Module
//!
//! Chooses which entry leaves a full cache.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;

// == Eviction Policy ==
/// Named eviction policy a cache is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvictionPolicy {
    /// Least recently used; reads count as re-insertion
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
    /// First in, first out; reads do not change order
    Fifo,
}

impl EvictionPolicy {
    /// Whether a successful read refreshes the entry's insertion time.
    pub fn refreshes_on_read(self) -> bool {
        matches!(self, EvictionPolicy::Lru)
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionPolicy::Lru => "LRU",
            EvictionPolicy::Lfu => "LFU",
            EvictionPolicy::Fifo => "FIFO",
        };
        f.write_str(name)
    }
}

// == Eviction Mode ==
/// How faithfully the named policy is honoured.
///
/// `Legacy` evicts the entry with the oldest insertion time whatever the
/// policy name says, matching deployments that only ever had one algorithm.
/// `Strict` tracks access counts for LFU and insertion order for FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionMode {
    #[default]
    Strict,
    Legacy,
}

impl FromStr for EvictionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(EvictionMode::Strict),
            "legacy" => Ok(EvictionMode::Legacy),
            other => Err(format!("unknown eviction mode '{}'", other)),
        }
    }
}

// == Select Victim ==
/// Scans every entry and returns the key that should be evicted next.
///
/// Returns None if the map is empty.
pub fn select_victim<T>(
    entries: &HashMap<String, CacheEntry<T>>,
    policy: EvictionPolicy,
    mode: EvictionMode,
) -> Option<String> {
    let victim = match (mode, policy) {
        (EvictionMode::Legacy, _) | (EvictionMode::Strict, EvictionPolicy::Lru) => entries
            .iter()
            .min_by_key(|(_, entry)| (entry.inserted_at, entry.last_access)),
        (EvictionMode::Strict, EvictionPolicy::Lfu) => entries
            .iter()
            .min_by_key(|(_, entry)| (entry.hits, entry.inserted_at, entry.last_access)),
        (EvictionMode::Strict, EvictionPolicy::Fifo) => {
            entries.iter().min_by_key(|(_, entry)| entry.sequence)
        }
    };

    victim.map(|(key, _)| key.clone())
}
