//! sqlcache benchmark entry point.
//!
//! Seeds an `items` table, then times the same range query against the raw
//! adapter and through the cache, printing a JSON report on stdout.
//! Logging goes to stderr so the report stays machine-readable.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use sqlcache_client::{CacheStats, QueryCache, QueryOptions, Strategy};
use sqlcache_core::{CacheConfig, Params, SqlAdapter, SqliteAdapter};
use tracing_subscriber::EnvFilter;

const SEED_ROWS: u32 = 5_000;
const BENCH_SQL: &str = "SELECT * FROM items WHERE id <= ?";

/// Benchmark settings, read from `SQLCACHE_BENCH_*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BenchConfig {
    /// SQLCACHE_BENCH_DB_PATH
    db_path: PathBuf,
    /// SQLCACHE_BENCH_RUNS
    runs: u32,
    /// SQLCACHE_BENCH_LIMIT, the `id <= ?` bound
    limit: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self { db_path: PathBuf::from("./sqlcache-bench.sqlite"), runs: 5_000, limit: 3_000 }
    }
}

impl BenchConfig {
    fn load() -> Result<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("SQLCACHE_BENCH_").map(|key| key.as_str().to_lowercase().into()))
            .extract()
            .context("invalid SQLCACHE_BENCH_* settings")
    }
}

#[derive(Debug, Serialize)]
struct BenchReport {
    runs: u32,
    rows_per_query: usize,
    raw_ms: u128,
    cached_ms: u128,
    speedup: String,
    stats: CacheStats,
}

async fn seed(adapter: &SqliteAdapter) -> Result<()> {
    let sql = format!(
        "DROP TABLE IF EXISTS items;
         CREATE TABLE items(id INTEGER PRIMARY KEY, v TEXT);
         WITH RECURSIVE seq(n) AS (SELECT 0 UNION ALL SELECT n + 1 FROM seq WHERE n < {last})
         INSERT INTO items(v) SELECT 'value-' || n FROM seq;",
        last = SEED_ROWS - 1
    );
    adapter.exec(&sql).await.context("failed to seed items table")
}

fn speedup(raw: Duration, cached: Duration) -> String {
    if cached.is_zero() {
        return "inf".to_string();
    }
    format!("{:.2}x", raw.as_secs_f64() / cached.as_secs_f64())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let bench = BenchConfig::load()?;
    let config = CacheConfig::load().context("invalid SQLCACHE_* settings")?;

    tracing::info!(db_path = %bench.db_path.display(), runs = bench.runs, "Starting sqlcache benchmark");

    let adapter = SqliteAdapter::open(&bench.db_path).await?;
    seed(&adapter).await?;

    let params = Params::from([bench.limit]);

    let started = Instant::now();
    let mut rows_per_query = 0;
    for _ in 0..bench.runs {
        rows_per_query = adapter.execute(BENCH_SQL, &params).await?.len();
    }
    let raw = started.elapsed();

    let cache = QueryCache::new(adapter.clone(), &config).await;
    let started = Instant::now();
    for _ in 0..bench.runs {
        cache.query(BENCH_SQL, params.clone(), QueryOptions::new(Strategy::CacheFirst)).await?;
    }
    let cached = started.elapsed();
    cache.stop();

    let report = BenchReport {
        runs: bench.runs,
        rows_per_query,
        raw_ms: raw.as_millis(),
        cached_ms: cached.as_millis(),
        speedup: speedup(raw, cached),
        stats: cache.stats(),
    };

    tracing::info!(raw_ms = report.raw_ms, cached_ms = report.cached_ms, "Benchmark finished");
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
