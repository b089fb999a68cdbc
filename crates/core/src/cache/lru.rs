//! Bounded key-value store with least-recently-used eviction.
//!
//! Recency is tracked by the `lru` crate (hash map plus intrusive linked
//! list), so `get`, `set` and `delete` are O(1). The store knows nothing
//! about queries or strategies.

use std::num::NonZeroUsize;

use lru::LruCache;

/// Bounded store keyed by cache key.
///
/// Holds at most `capacity` entries. Inserting into a full store evicts the
/// entry that has gone longest without a `get` or `set`.
#[derive(Debug)]
pub struct EvictionStore<V> {
    entries: LruCache<String, V>,
}

impl<V> EvictionStore<V> {
    /// Create a store holding at most `max_items` entries (clamped to at least one).
    pub fn new(max_items: usize) -> Self {
        let capacity = NonZeroUsize::new(max_items).unwrap_or(NonZeroUsize::MIN);
        Self { entries: LruCache::new(capacity) }
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Look up an entry without touching its recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Insert or replace an entry and mark it most recently used.
    ///
    /// Returns the key evicted to stay within capacity, if any.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> Option<String> {
        let key = key.into();
        match self.entries.push(key.clone(), value) {
            Some((old_key, _)) if old_key != key => Some(old_key),
            _ => None,
        }
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.pop(key).is_some()
    }

    /// Remove every entry for which `keep` returns false. Returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &V) -> bool) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, value)| !keep(key.as_str(), *value))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.entries.pop(key.as_str());
        }
        doomed.len()
    }

    /// Remove everything. Returns how many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Live keys, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
