//! Compatibility check result caching.
//!
//! Backward/forward checks are pure functions of their two schema strings,
//! so results are cached by content hash to avoid re-parsing and
//! re-resolving identical pairs repeatedly (e.g. a topic rollover decision
//! rechecking the same candidate against several enabled schemas).

use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Which direction of [`crate::resolution::resolves`] a cache entry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Backward,
    Forward,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    old_hash: String,
    new_hash: String,
    direction: Direction,
}

/// A bounded, time-limited cache of `(old, new, direction) -> bool` results.
pub struct CompatibilityCache {
    cache: Cache<CacheKey, bool>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CompatibilityCache {
    pub fn new(max_capacity: u64, ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();

        Self {
            cache,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the cached result for `(old_hash, new_hash, direction)`,
    /// computing and storing it with `compute` on a miss.
    pub async fn get_or_compute<F>(
        &self,
        old_hash: &str,
        new_hash: &str,
        direction: Direction,
        compute: F,
    ) -> bool
    where
        F: FnOnce() -> bool,
    {
        let key = CacheKey {
            old_hash: old_hash.to_string(),
            new_hash: new_hash.to_string(),
            direction,
        };

        if let Some(result) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return result;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = compute();
        self.cache.insert(key, result).await;
        result
    }

    /// `(hits, misses, hit_rate)`.
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        (hits, misses, hit_rate)
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn size(&self) -> u64 {
        self.cache.entry_count()
    }
}
