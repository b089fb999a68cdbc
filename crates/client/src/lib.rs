//! Caching client for sqlcache.
//!
//! This crate provides the caller-facing query cache (strategies,
//! invalidation, statistics) and the change tracker that keeps it honest
//! when other connections write to the store.

pub mod query;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use query::{CacheStats, QueryCache, QueryOptions, Strategy};
pub use tracker::ChangeTracker;
