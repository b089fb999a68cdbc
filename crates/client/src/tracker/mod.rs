//! Change detection for the underlying store.
//!
//! ### Coarse polling
//! - Reads `PRAGMA data_version` on a fixed interval.
//! - The first observation only seeds the baseline.
//! - Any later difference fires the on-change callback.
//! - Poll errors are logged at debug level and the loop keeps going.
//!
//! `PRAGMA data_version` only moves for commits made through *other*
//! connections, so writes issued on the tracker's own connection are not seen.
//!
//! ### Per-table touch log
//! - [`ChangeTracker::install_table_triggers`] records the last write time per table.
//! - [`ChangeTracker::get_touched_tables`] lists tables written since a timestamp.

mod triggers;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use sqlcache_core::{Params, SqlAdapter};
use tokio::task::JoinHandle;

pub use triggers::{TOUCH_TABLE, sanitize_table_name};

const DATA_VERSION_SQL: &str = "PRAGMA data_version;";

type OnChange = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Default)]
struct PollState {
    last_data_version: Option<i64>,
    stopped: bool,
}

struct Shared {
    adapter: Arc<dyn SqlAdapter>,
    on_change: OnChange,
    polling: Duration,
    state: Mutex<PollState>,
}

/// Watches a store for commits and reports them through a callback.
pub struct ChangeTracker {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ChangeTracker {
    /// Create a stopped tracker. Call [`start`](Self::start) to begin polling.
    pub fn new(adapter: Arc<dyn SqlAdapter>, polling: Duration, on_change: impl Fn() + Send + Sync + 'static) -> Self {
        let shared = Shared {
            adapter,
            on_change: Box::new(on_change),
            polling,
            state: Mutex::new(PollState::default()),
        };
        Self { shared: Arc::new(shared), task: Mutex::new(None) }
    }

    /// Run one check immediately, then poll every interval until stopped.
    ///
    /// Restarting replaces the previous polling task.
    pub async fn start(&self) {
        self.shared.state.lock().stopped = false;
        if !self.shared.check().await {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(shared.polling).await;
                if !shared.check().await {
                    break;
                }
            }
        });

        let mut task = self.task.lock();
        if self.shared.state.lock().stopped {
            handle.abort();
            return;
        }
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
    }

    /// Stop polling. No callback fires after this returns.
    pub fn stop(&self) {
        self.shared.state.lock().stopped = true;
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        let stopped = self.shared.state.lock().stopped;
        !stopped && self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// The last `data_version` observed, if any poll has succeeded.
    pub fn last_data_version(&self) -> Option<i64> {
        self.shared.state.lock().last_data_version
    }

    pub fn polling_interval(&self) -> Duration {
        self.shared.polling
    }

    /// Run a single poll outside the timer.
    pub async fn check_now(&self) {
        self.shared.check().await;
    }
}

impl Shared {
    /// Poll once. Returns false when the tracker has been stopped.
    async fn check(&self) -> bool {
        let version = match self.adapter.execute(DATA_VERSION_SQL, &Params::None).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("data_version"))
                .and_then(Value::as_i64)
                .unwrap_or(0),
            Err(e) => {
                tracing::debug!(error = %e, "data_version poll failed");
                return !self.state.lock().stopped;
            }
        };

        let mut state = self.state.lock();
        if state.stopped {
            return false;
        }

        match state.last_data_version.replace(version) {
            Some(previous) if previous != version => {
                tracing::debug!(previous, current = version, "store changed");
                (self.on_change)();
            }
            _ => {}
        }
        true
    }
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("polling", &self.shared.polling)
            .field("last_data_version", &self.last_data_version())
            .finish_non_exhaustive()
    }
}

impl Drop for ChangeTracker {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
