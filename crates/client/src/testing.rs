//! Scripted adapter for strategy and failure tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sqlcache_core::{Error, Params, Row, SqlAdapter};

#[derive(Debug, Default)]
struct MockState {
    rows: Mutex<Vec<Row>>,
    fail_queries: AtomicBool,
    fail_polls: AtomicBool,
    calls: AtomicUsize,
    data_version: AtomicI64,
}

/// Returns whatever rows it was last given. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockAdapter {
    state: Arc<MockState>,
}

impl MockAdapter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_rows(rows: Vec<Row>) -> Self {
        let adapter = Self::new();
        adapter.set_rows(rows);
        adapter
    }

    pub(crate) fn set_rows(&self, rows: Vec<Row>) {
        *self.state.rows.lock() = rows;
    }

    pub(crate) fn fail_queries(&self, fail: bool) {
        self.state.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_polls(&self, fail: bool) {
        self.state.fail_polls.store(fail, Ordering::SeqCst);
    }

    /// Query executions so far, not counting `data_version` polls.
    pub(crate) fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_data_version(&self, version: i64) {
        self.state.data_version.store(version, Ordering::SeqCst);
    }

    pub(crate) fn bump_data_version(&self) {
        self.state.data_version.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SqlAdapter for MockAdapter {
    async fn execute(&self, sql: &str, _params: &Params) -> Result<Vec<Row>, Error> {
        if sql.trim_start().to_ascii_uppercase().starts_with("PRAGMA DATA_VERSION") {
            if self.state.fail_polls.load(Ordering::SeqCst) {
                return Err(Error::Adapter("poll failed".into()));
            }
            let version = self.state.data_version.load(Ordering::SeqCst);
            return Ok(vec![row([("data_version", json!(version))])]);
        }

        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_queries.load(Ordering::SeqCst) {
            return Err(Error::Adapter("connection refused".into()));
        }
        Ok(self.state.rows.lock().clone())
    }

    async fn exec(&self, _sql: &str) -> Result<(), Error> {
        Ok(())
    }

    fn database_id(&self) -> Option<&str> {
        Some("mock")
    }
}

/// Build a row from column/value pairs.
pub(crate) fn row<const N: usize>(columns: [(&str, Value); N]) -> Row {
    columns.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
