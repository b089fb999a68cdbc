//! Cache statistics tracking.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Per-instance counters. Never shared between caches.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    queries: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_items: usize) -> CacheStats {
        let total_queries = self.queries.load(Ordering::Relaxed);
        let cache_hits = self.hits.load(Ordering::Relaxed);
        let hit_rate = if total_queries == 0 { 0.0 } else { cache_hits as f64 / total_queries as f64 };

        CacheStats {
            total_items,
            total_queries,
            cache_hits,
            cache_misses: self.misses.load(Ordering::Relaxed),
            hit_rate,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a cache's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entries in the eviction store.
    pub total_items: usize,
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// `cache_hits / total_queries`, or 0 before the first query.
    pub hit_rate: f64,
    /// Entries dropped to stay within capacity.
    pub evictions: u64,
}
