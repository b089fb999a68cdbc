//! Per-query options and caching strategies.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlcache_core::Error;

/// How a query trades freshness against latency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve a live entry when there is one, otherwise fetch.
    #[default]
    CacheFirst,
    /// Always fetch; fall back to any cached entry when the fetch fails.
    NetworkFirst,
    /// Serve any entry immediately and refresh expired ones in the background.
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache-first" => Ok(Strategy::CacheFirst),
            "network-first" => Ok(Strategy::NetworkFirst),
            "stale-while-revalidate" => Ok(Strategy::StaleWhileRevalidate),
            other => Err(Error::InvalidInput(format!("unknown strategy: {other}"))),
        }
    }
}

/// Options for a single query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub strategy: Strategy,
    /// Lifetime of the written entry; the cache default when unset.
    pub ttl: Option<Duration>,
    /// Tables the query touches. Replaces the extracted set when non-empty.
    pub tables: Vec<String>,
    /// Labels for batch invalidation.
    pub tags: Vec<String>,
    /// Replaces key derivation, letting different queries share an entry.
    pub key: Option<String>,
    /// Truncate freshly fetched results to this many rows.
    pub max_rows: Option<usize>,
}

impl QueryOptions {
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy, ..Default::default() }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

impl From<Strategy> for QueryOptions {
    fn from(strategy: Strategy) -> Self {
        Self::new(strategy)
    }
}
