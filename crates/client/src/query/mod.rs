//! Query result cache in front of a [`SqlAdapter`].
//!
//! ### Strategies
//! - `cache-first`: serve a live entry, otherwise fetch and store.
//! - `network-first`: always fetch; on failure fall back to any stored entry.
//! - `stale-while-revalidate`: serve any stored entry at once and refresh
//!   expired ones in a detached task.
//!
//! ### Invalidation
//! - By key, tag or table, or everything at once.
//! - Everything, whenever the [`ChangeTracker`] sees another connection commit.
//! - By table, from the touch log written by per-table triggers.

mod options;
mod stats;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sqlcache_core::cache::key::{DEFAULT_DATABASE_ID, versioned};
use sqlcache_core::cache::{KEY_PREFIX, compute_cache_key};
use sqlcache_core::{
    CacheConfig, CacheEntry, Error, EvictionStore, Params, QueryResult, SqlAdapter, extract_tables, normalize_tables,
};

pub use options::{QueryOptions, Strategy};
pub use stats::CacheStats;

use crate::tracker::ChangeTracker;
use stats::StatsCounters;

const SQL_PREVIEW_CHARS: usize = 100;

/// Emit a diagnostic event tagged with the database id, only when verbose.
macro_rules! diag {
    ($inner:expr, $level:ident, $($arg:tt)+) => {
        if $inner.verbose {
            tracing::$level!(db_id = %$inner.db_id, $($arg)+);
        }
    };
}

/// Caching front for a data store.
///
/// Cloning is cheap and shares the same entries, counters and tracker.
/// Dropping the last clone stops change polling.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

struct Inner {
    adapter: Arc<dyn SqlAdapter>,
    db_id: String,
    store: Mutex<EvictionStore<CacheEntry>>,
    stats: StatsCounters,
    default_ttl: Duration,
    verbose: bool,
    tracker: Option<ChangeTracker>,
    last_touch_check: AtomicI64,
}

/// Everything needed to run a query and store its result, detached from the caller.
#[derive(Debug, Clone)]
struct Fetch {
    key: String,
    sql: String,
    params: Params,
    ttl: Duration,
    tables: BTreeSet<String>,
    tags: BTreeSet<String>,
    max_rows: Option<usize>,
}

impl QueryCache {
    /// Build a cache over `adapter`, starting change polling when configured.
    pub async fn new<A: SqlAdapter + 'static>(adapter: A, config: &CacheConfig) -> Self {
        Self::with_adapter(Arc::new(adapter), config).await
    }

    /// Build a cache over a shared adapter.
    pub async fn with_adapter(adapter: Arc<dyn SqlAdapter>, config: &CacheConfig) -> Self {
        let db_id = adapter.database_id().unwrap_or(DEFAULT_DATABASE_ID).to_string();

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let tracker = config.watch_changes.then(|| {
                let weak = weak.clone();
                ChangeTracker::new(Arc::clone(&adapter), config.polling_interval(), move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.invalidate_all();
                    }
                })
            });

            Inner {
                adapter,
                db_id,
                store: Mutex::new(EvictionStore::new(config.lru.max_items)),
                stats: StatsCounters::default(),
                default_ttl: config.default_ttl(),
                verbose: config.verbose,
                tracker,
                last_touch_check: AtomicI64::new(now_ms()),
            }
        });

        if let Some(tracker) = &inner.tracker {
            tracker.start().await;
        }

        diag!(
            inner,
            info,
            max_items = config.lru.max_items,
            watch_changes = config.watch_changes,
            polling_ms = config.polling_ms,
            "query cache ready"
        );
        Self { inner }
    }

    /// Run a query through the cache.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error when a fetch fails and the strategy has no
    /// stored entry to fall back on.
    pub async fn query(&self, sql: &str, params: impl Into<Params>, options: QueryOptions) -> Result<QueryResult, Error> {
        let inner = &self.inner;
        let QueryOptions { strategy, ttl, tables, tags, key, max_rows } = options;
        let params = params.into();

        let key = compute_cache_key(&inner.db_id, sql, &params, key.as_deref())?;
        inner.stats.record_query();
        diag!(inner, debug, strategy = %strategy, key = %key, sql = %preview(sql), "query");

        let plan = |key: String| Fetch {
            key,
            sql: sql.to_string(),
            params,
            ttl: ttl.unwrap_or(inner.default_ttl),
            tables: if tables.is_empty() { extract_tables(sql) } else { normalize_tables(&tables) },
            tags: tags.into_iter().collect(),
            max_rows,
        };

        match strategy {
            Strategy::CacheFirst => {
                if let Some((hit, _)) = inner.serve(&key, false) {
                    inner.stats.record_hit();
                    diag!(inner, debug, key = %key, strategy = %strategy, "cache hit");
                    return Ok(hit);
                }

                inner.stats.record_miss();
                diag!(inner, debug, key = %key, strategy = %strategy, "cache miss");
                inner.fetch(&plan(key), false).await
            }
            Strategy::NetworkFirst => {
                let plan = plan(key);
                match inner.fetch(&plan, false).await {
                    Ok(result) => {
                        inner.stats.record_miss();
                        Ok(result)
                    }
                    Err(e) => match inner.serve(&plan.key, true) {
                        Some((fallback, _)) => {
                            inner.stats.record_hit();
                            diag!(inner, info, key = %plan.key, error = %e, "network-first fallback to cache");
                            Ok(fallback)
                        }
                        None => {
                            inner.stats.record_miss();
                            Err(e)
                        }
                    },
                }
            }
            Strategy::StaleWhileRevalidate => {
                let Some((hit, expired)) = inner.serve(&key, true) else {
                    inner.stats.record_miss();
                    diag!(inner, debug, key = %key, strategy = %strategy, "cache miss");
                    return inner.fetch(&plan(key), false).await;
                };

                inner.stats.record_hit();
                diag!(inner, debug, key = %key, strategy = %strategy, stale = expired, "cache hit");

                if expired {
                    let plan = plan(key);
                    let inner = Arc::clone(inner);
                    tokio::spawn(async move {
                        if let Err(e) = inner.fetch(&plan, true).await {
                            tracing::debug!(db_id = %inner.db_id, key = %plan.key, error = %e, "revalidation failed");
                        }
                    });
                }
                Ok(hit)
            }
        }
    }

    /// Drop one entry. Accepts a key override as passed in [`QueryOptions::key`]
    /// or a full key from [`cache_key`](Self::cache_key).
    ///
    /// The override reading wins: `"v1:report"` first removes the entry stored
    /// under override `v1:report`, and only falls back to the full key
    /// `v1:report` when there is none.
    pub fn invalidate_by_key(&self, key: &str) -> bool {
        let existed = {
            let mut store = self.inner.store.lock();
            store.delete(&versioned(key)) || (key.starts_with(KEY_PREFIX) && store.delete(key))
        };
        diag!(self.inner, info, key = %key, existed, "cache entry invalidated by key");
        existed
    }

    /// Drop every entry carrying `tag`. Returns how many were dropped.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let count = self.inner.store.lock().retain(|_, entry| !entry.tags.contains(tag));
        diag!(self.inner, info, tag = %tag, count, "cache entries invalidated by tag");
        count
    }

    /// Drop every entry that read from `table` (case-insensitive).
    pub fn invalidate_by_table(&self, table: &str) -> usize {
        self.inner.invalidate_by_table(table)
    }

    /// Drop everything.
    pub fn invalidate_all(&self) -> usize {
        self.inner.invalidate_all()
    }

    /// Drop entries for every table the touch log reports written at or after
    /// `since_ms` (ms since the Unix epoch). Returns the touched tables.
    ///
    /// A cache built without change watching has no tracker and returns an
    /// empty list.
    pub async fn invalidate_touched_since(&self, since_ms: i64) -> Result<Vec<String>, Error> {
        let Some(tracker) = &self.inner.tracker else {
            return Ok(Vec::new());
        };

        let checked_at = now_ms();
        let touched = tracker.get_touched_tables(since_ms).await?;
        for table in &touched {
            self.inner.invalidate_by_table(table);
        }
        self.inner.last_touch_check.store(checked_at, Ordering::Relaxed);

        diag!(self.inner, debug, since_ms, touched = ?touched, "invalidated touched tables");
        Ok(touched)
    }

    /// Like [`invalidate_touched_since`](Self::invalidate_touched_since), starting
    /// from the previous touch check (or cache creation).
    pub async fn invalidate_touched(&self) -> Result<Vec<String>, Error> {
        let since = self.inner.last_touch_check.load(Ordering::Relaxed);
        self.invalidate_touched_since(since).await
    }

    pub fn stats(&self) -> CacheStats {
        let total_items = self.inner.store.lock().len();
        self.inner.stats.snapshot(total_items)
    }

    /// Stop change polling. Entries stay cached.
    pub fn stop(&self) {
        if let Some(tracker) = &self.inner.tracker {
            tracker.stop();
            diag!(self.inner, info, "change tracking stopped");
        }
    }

    /// The cache's own tracker, present when change watching is enabled.
    pub fn change_tracker(&self) -> Option<&ChangeTracker> {
        self.inner.tracker.as_ref()
    }

    /// The key a query would be stored under.
    pub fn cache_key(&self, sql: &str, params: &Params, key_override: Option<&str>) -> Result<String, Error> {
        compute_cache_key(&self.inner.db_id, sql, params, key_override)
    }

    pub fn database_id(&self) -> &str {
        &self.inner.db_id
    }

    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.lock().is_empty()
    }
}

impl Inner {
    /// Serve the entry under `key`, returning it with whether it had expired.
    ///
    /// Expired entries are only served when `allow_expired` is set.
    fn serve(&self, key: &str, allow_expired: bool) -> Option<(QueryResult, bool)> {
        let now = Instant::now();
        let mut store = self.store.lock();
        let entry = store.get(key)?;

        let expired = entry.is_expired(now);
        if expired && !allow_expired {
            return None;
        }
        Some((entry.serve(now), expired))
    }

    /// Run the query and store its result.
    async fn fetch(&self, plan: &Fetch, revalidated: bool) -> Result<QueryResult, Error> {
        let mut rows = self.adapter.execute(&plan.sql, &plan.params).await?;
        if let Some(max_rows) = plan.max_rows {
            rows.truncate(max_rows);
        }

        let result = QueryResult { rows, from_cache: false, revalidated };
        let entry = CacheEntry::new(result.clone(), Instant::now(), plan.ttl, plan.tables.clone(), plan.tags.clone());
        let evicted = self.store.lock().set(plan.key.clone(), entry);

        if let Some(evicted) = evicted {
            self.stats.record_eviction();
            diag!(self, debug, key = %evicted, "cache entry evicted");
        }
        diag!(
            self,
            debug,
            key = %plan.key,
            tables = ?plan.tables,
            ttl = ?plan.ttl,
            rows = result.rows.len(),
            revalidated,
            "entry cached"
        );
        Ok(result)
    }

    fn invalidate_by_table(&self, table: &str) -> usize {
        let table = table.trim().to_lowercase();
        let count = self.store.lock().retain(|_, entry| !entry.tables.contains(&table));
        diag!(self, info, table = %table, count, "cache entries invalidated by table");
        count
    }

    fn invalidate_all(&self) -> usize {
        let count = self.store.lock().clear();
        diag!(self, warn, count, "all cache entries invalidated");
        count
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("db_id", &self.inner.db_id)
            .field("len", &self.len())
            .field("default_ttl", &self.inner.default_ttl)
            .field("tracker", &self.inner.tracker)
            .finish_non_exhaustive()
    }
}

fn preview(sql: &str) -> String {
    match sql.char_indices().nth(SQL_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &sql[..cut]),
        None => sql.to_string(),
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
