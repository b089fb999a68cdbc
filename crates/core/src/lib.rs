//! Core types and shared functionality for sqlcache.
//!
//! This crate provides:
//! - Data-store adapter trait with a SQLite implementation
//! - Cache entries, key derivation and the LRU eviction store
//! - Table extraction heuristic used to tag entries
//! - Unified error types
//! - Configuration structures

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod tables;

pub use adapter::{Params, Row, SqlAdapter, SqliteAdapter};
pub use cache::{CacheEntry, EvictionStore, QueryResult};
pub use config::{CacheConfig, ConfigError};
pub use error::Error;
pub use tables::{extract_tables, normalize_tables};
