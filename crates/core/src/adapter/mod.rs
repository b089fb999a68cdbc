//! Data-store capability consumed by the cache.
//!
//! The cache never talks to a database directly. It goes through
//! [`SqlAdapter`], which runs parameterized statements and returns rows as
//! JSON objects. [`SqliteAdapter`] is the bundled implementation.

mod sqlite;
mod value;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

pub use sqlite::SqliteAdapter;

/// A result row: column name to value.
pub type Row = serde_json::Map<String, Value>;

/// Statement parameters.
///
/// Serializes untagged (`null`, a JSON array or a JSON object) so the
/// serialized form can take part in cache key derivation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

impl Params {
    /// Build positional parameters from anything convertible to JSON values.
    pub fn positional<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Build named parameters. Names may omit the `:` sigil.
    pub fn named<I, K, T>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Params::Named(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(values) => values.is_empty(),
            Params::Named(values) => values.is_empty(),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Params {
    fn from(values: [T; N]) -> Self {
        Params::positional(values)
    }
}

/// Capability to run statements against the underlying store.
#[async_trait]
pub trait SqlAdapter: Send + Sync {
    /// Run a query and return its rows in order.
    async fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>, Error>;

    /// Run one or more statements that return nothing (DDL, triggers).
    async fn exec(&self, sql: &str) -> Result<(), Error>;

    /// Identity used to namespace cache keys when several stores share a cache.
    fn database_id(&self) -> Option<&str> {
        None
    }
}
