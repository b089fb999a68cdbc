//! In-memory query result cache primitives.
//!
//! This module provides the pieces the query engine is assembled from:
//!
//! - Versioned cache key derivation
//! - Cache entries with TTL and access bookkeeping
//! - A bounded store with strict LRU eviction

pub mod entry;
pub mod key;
pub mod lru;

pub use entry::{CacheEntry, QueryResult};
pub use key::{KEY_PREFIX, compute_cache_key};
pub use lru::EvictionStore;
