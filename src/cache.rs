//! Memoization cache for per-location feature queries.
//!
//! Keyed by rounded coordinate so nearby repeated requests reuse the same
//! feature vector instead of recomputing it. Bounded by a max entry count
//! and an entry age limit; nothing fancier, it is a memoization layer, not
//! a storage engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::feature_extractor::FeatureVector;
use crate::geo::RoundedCoord;

/// Cache tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Decimal places used to round coordinates into keys
    pub precision: u32,
    /// Maximum number of entries held at once
    pub max_entries: usize,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            precision: 4,
            max_entries: 4096,
            ttl_secs: 3600,
        }
    }
}

struct CacheEntry {
    features: FeatureVector,
    inserted_at: Instant,
}

/// Thread-safe feature cache keyed by rounded coordinates.
pub struct FeatureCache {
    entries: RwLock<HashMap<RoundedCoord, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl FeatureCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
        }
    }

    /// Fetch the cached features for a key, or compute and store them.
    ///
    /// Returns the feature vector and whether it was served from cache.
    pub fn get_or_compute<F>(&self, key: RoundedCoord, compute: F) -> (FeatureVector, bool)
    where
        F: FnOnce() -> FeatureVector,
    {
        // Fast path under the read lock
        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(&key) {
                if entry.inserted_at.elapsed() < self.ttl {
                    return (entry.features, true);
                }
            }
        }

        let features = compute();

        if let Ok(mut entries) = self.entries.write() {
            // Drop the stale entry for this key, if any, then make room
            entries.remove(&key);
            if entries.len() >= self.max_entries {
                Self::evict_oldest(&mut entries);
            }
            entries.insert(
                key,
                CacheEntry {
                    features,
                    inserted_at: Instant::now(),
                },
            );
        }

        (features, false)
    }

    fn evict_oldest(entries: &mut HashMap<RoundedCoord, CacheEntry>) {
        if let Some(oldest) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(&key, _)| key)
        {
            entries.remove(&oldest);
        }
    }

    /// Current number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
