//! Per-table write triggers feeding a touch log.

use sqlcache_core::{Error, Params, SqlAdapter};

use super::ChangeTracker;

/// Table holding the last write time (ms since the Unix epoch) per watched table.
pub const TOUCH_TABLE: &str = "_sqlcache_touch";

const NOW_MS: &str = "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

/// Strip everything outside `[A-Za-z0-9_]` from a table name.
///
/// The result is interpolated into DDL, so names that sanitize to nothing
/// are rejected.
pub fn sanitize_table_name(table: &str) -> Result<String, Error> {
    let clean: String = table.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
    if clean.is_empty() {
        return Err(Error::InvalidInput(format!("table name has no usable characters: {table:?}")));
    }
    Ok(clean)
}

fn touch_log_ddl() -> String {
    format!("CREATE TABLE IF NOT EXISTS {TOUCH_TABLE}(tbl TEXT PRIMARY KEY, ts INTEGER);")
}

fn trigger_ddl(table: &str, op: &str) -> String {
    let name = format!("_sqlcache_trg_{table}_{}", op.to_lowercase());
    format!(
        "CREATE TRIGGER IF NOT EXISTS {name} AFTER {op} ON {table}
         BEGIN
             INSERT INTO {TOUCH_TABLE}(tbl, ts) VALUES ('{table}', {NOW_MS})
             ON CONFLICT(tbl) DO UPDATE SET ts = excluded.ts;
         END;"
    )
}

impl ChangeTracker {
    /// Record every insert, update and delete on `table` in the touch log.
    ///
    /// Idempotent. The table must already exist.
    pub async fn install_table_triggers(&self, table: &str) -> Result<(), Error> {
        let table = sanitize_table_name(table)?;
        let adapter = &self.shared.adapter;

        adapter.exec(&touch_log_ddl()).await?;
        for op in ["INSERT", "UPDATE", "DELETE"] {
            adapter.exec(&trigger_ddl(&table, op)).await?;
        }

        tracing::debug!(table = %table, "installed touch triggers");
        Ok(())
    }

    /// Tables written at or after `since_ms` (ms since the Unix epoch), sorted by name.
    pub async fn get_touched_tables(&self, since_ms: i64) -> Result<Vec<String>, Error> {
        let adapter = &self.shared.adapter;
        adapter.exec(&touch_log_ddl()).await?;

        let sql = format!("SELECT tbl FROM {TOUCH_TABLE} WHERE ts >= ? ORDER BY tbl");
        let rows = adapter.execute(&sql, &Params::from([since_ms])).await?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("tbl").and_then(|v| v.as_str()).map(String::from))
            .collect())
    }
}
