//! SQLite adapter with pragma configuration.
//!
//! This module handles opening the SQLite database, applying pragmas
//! for performance and concurrency (WAL mode), and converting rows into
//! JSON objects for the cache.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{self, ToSql};

use super::value::{from_sql, param_name, to_sql};
use super::{Params, Row, SqlAdapter};
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

static MEMORY_IDS: AtomicU64 = AtomicU64::new(0);

/// SQLite data-store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the same connection.
#[derive(Clone, Debug)]
pub struct SqliteAdapter {
    pub(crate) conn: Connection,
    id: String,
}

impl SqliteAdapter {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist and applies performance pragmas.
    /// The path doubles as the database id.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let id = path.as_ref().display().to_string();
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::configure(&conn).await?;

        Ok(Self { conn, id })
    }

    /// Open an in-memory database.
    ///
    /// Each in-memory store gets a unique `memory-N` id so that two of them
    /// never share cache keys.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::configure(&conn).await?;

        let id = format!("memory-{}", MEMORY_IDS.fetch_add(1, Ordering::Relaxed));
        Ok(Self { conn, id })
    }

    /// Replace the database id used to namespace cache keys.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    async fn configure(conn: &Connection) -> Result<(), Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)
    }
}

fn query_rows(conn: &rusqlite::Connection, sql: &str, params: &Params) -> Result<Vec<Row>, Error> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = match params {
        Params::None => stmt.query([])?,
        Params::Positional(values) => stmt.query(rusqlite::params_from_iter(values.iter().map(to_sql)))?,
        Params::Named(values) => {
            let bound: Vec<(String, rusqlite::types::Value)> =
                values.iter().map(|(name, value)| (param_name(name), to_sql(value))).collect();
            let named: Vec<(&str, &dyn ToSql)> =
                bound.iter().map(|(name, value)| (name.as_str(), value as &dyn ToSql)).collect();
            stmt.query(named.as_slice())?
        }
    };

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (idx, column) in columns.iter().enumerate() {
            record.insert(column.clone(), from_sql(row.get_ref(idx)?));
        }
        out.push(record);
    }

    Ok(out)
}

#[async_trait]
impl SqlAdapter for SqliteAdapter {
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>, Error> {
        let sql = sql.to_string();
        let params = params.clone();
        self.conn
            .call(move |conn| -> Result<Vec<Row>, Error> { query_rows(conn, &sql, &params) })
            .await
            .map_err(Error::from)
    }

    async fn exec(&self, sql: &str) -> Result<(), Error> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    fn database_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seeded() -> SqliteAdapter {
        let db = SqliteAdapter::open_in_memory().await.unwrap();
        db.exec(
            "CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT, score REAL, data BLOB);
             INSERT INTO t(v, score, data) VALUES ('a', 1.5, x'01ff'), ('b', NULL, NULL), ('c', 3.0, NULL);",
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = SqliteAdapter::open_in_memory().await.unwrap();
        let version = db
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_ids_are_unique() {
        let a = SqliteAdapter::open_in_memory().await.unwrap();
        let b = SqliteAdapter::open_in_memory().await.unwrap();
        assert_ne!(a.database_id(), b.database_id());

        let named = a.with_id("primary");
        assert_eq!(named.database_id(), Some("primary"));
    }

    #[tokio::test]
    async fn test_execute_positional() {
        let db = seeded().await;
        let rows = db.execute("SELECT id, v FROM t WHERE id <= ?", &Params::from([2])).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&json!(1)));
        assert_eq!(rows[1].get("v"), Some(&json!("b")));
        let columns: Vec<&String> = rows[0].keys().collect();
        assert_eq!(columns, vec!["id", "v"]);
    }

    #[tokio::test]
    async fn test_execute_named() {
        let db = seeded().await;
        let rows = db
            .execute("SELECT id FROM t WHERE v = :v", &Params::named([("v", "c")]))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(3));
    }

    #[tokio::test]
    async fn test_execute_value_mapping() {
        let db = seeded().await;
        let rows = db.execute("SELECT score, data FROM t ORDER BY id", &Params::None).await.unwrap();

        assert_eq!(rows[0]["score"], json!(1.5));
        assert_eq!(rows[0]["data"], json!([1, 255]));
        assert_eq!(rows[1]["score"], json!(null));
        assert_eq!(rows[1]["data"], json!(null));
    }

    #[tokio::test]
    async fn test_pragma_data_version_row() {
        let db = SqliteAdapter::open_in_memory().await.unwrap();
        let rows = db.execute("PRAGMA data_version;", &Params::None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["data_version"].is_i64());
    }

    #[tokio::test]
    async fn test_execute_invalid_sql() {
        let db = SqliteAdapter::open_in_memory().await.unwrap();
        let err = db.execute("SELECT * FROM missing_table", &Params::None).await.unwrap_err();
        assert_eq!(err.code(), "DB_ERROR");
    }

    #[tokio::test]
    async fn test_open_file_uses_path_as_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let db = SqliteAdapter::open(&path).await.unwrap();
        assert_eq!(db.database_id(), Some(path.display().to_string().as_str()));
    }
}
