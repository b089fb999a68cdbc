//! Cached query results and their bookkeeping.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::adapter::Row;

/// Result of a cached query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Served from an existing entry rather than a fetch made by this call.
    pub from_cache: bool,
    /// Written by a background stale-while-revalidate refresh.
    #[serde(default)]
    pub revalidated: bool,
}

impl QueryResult {
    /// A freshly fetched result.
    pub fn fresh(rows: Vec<Row>) -> Self {
        Self { rows, from_cache: false, revalidated: false }
    }

    /// Deserialize every row into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.rows
            .iter()
            .map(|row| serde_json::from_value(serde_json::Value::Object(row.clone())).map_err(Error::Decode))
            .collect()
    }
}

/// A cached result plus the metadata that drives expiry and invalidation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: QueryResult,
    /// `None` when `created_at + ttl` is not representable; such entries never expire.
    pub expires_at: Option<Instant>,
    pub tables: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub created_at: Instant,
    pub last_access: Instant,
    pub hits: u64,
}

impl CacheEntry {
    pub fn new(
        value: QueryResult, now: Instant, ttl: Duration, tables: BTreeSet<String>, tags: BTreeSet<String>,
    ) -> Self {
        Self { value, expires_at: now.checked_add(ttl), tables, tags, created_at: now, last_access: now, hits: 0 }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Record a read and return the value as served from the cache.
    pub fn serve(&mut self, now: Instant) -> QueryResult {
        self.hits += 1;
        self.last_access = now;
        QueryResult { from_cache: true, ..self.value.clone() }
    }

    /// Age of the entry.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: i64, name: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(id));
        row.insert("name".into(), json!(name));
        row
    }

    #[test]
    fn test_expiry() {
        let now = Instant::now();
        let entry =
            CacheEntry::new(QueryResult::default(), now, Duration::from_millis(100), BTreeSet::new(), BTreeSet::new());

        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + Duration::from_millis(99)));
        assert!(entry.is_expired(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let now = Instant::now();
        let entry = CacheEntry::new(QueryResult::default(), now, Duration::ZERO, BTreeSet::new(), BTreeSet::new());
        assert!(entry.is_expired(now));
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let now = Instant::now();
        let entry = CacheEntry::new(QueryResult::default(), now, Duration::MAX, BTreeSet::new(), BTreeSet::new());
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired(now + Duration::from_secs(3600)));
    }

    #[test]
    fn test_serve_updates_bookkeeping() {
        let now = Instant::now();
        let mut entry = CacheEntry::new(
            QueryResult::fresh(vec![row(1, "a")]),
            now,
            Duration::from_secs(60),
            BTreeSet::new(),
            BTreeSet::new(),
        );

        let later = now + Duration::from_millis(5);
        let served = entry.serve(later);

        assert!(served.from_cache);
        assert!(!entry.value.from_cache);
        assert_eq!(entry.hits, 1);
        assert_eq!(entry.last_access, later);
        assert_eq!(entry.age(later), Duration::from_millis(5));
    }

    #[test]
    fn test_decode_rows() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct User {
            id: i64,
            name: String,
        }

        let result = QueryResult::fresh(vec![row(1, "Alice"), row(2, "Bob")]);
        let users: Vec<User> = result.decode().unwrap();
        assert_eq!(users[1], User { id: 2, name: "Bob".into() });

        let err = result.decode::<i64>().unwrap_err();
        assert_eq!(err.code(), "DECODE_FAILED");
    }
}
