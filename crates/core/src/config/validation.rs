//! Range checks applied to a loaded `CacheConfig`.

use crate::config::CacheConfig;
use thiserror::Error;

/// Longest accepted default TTL (30 days).
const MAX_DEFAULT_TTL_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `lru.max_items` is 0
    /// - `polling_ms` is less than 10ms or exceeds one hour
    /// - `default_ttl_ms` exceeds 30 days
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lru.max_items == 0 {
            return Err(ConfigError::Invalid { field: "lru.max_items".into(), reason: "must be greater than 0".into() });
        }

        if self.polling_ms < 10 {
            return Err(ConfigError::Invalid { field: "polling_ms".into(), reason: "must be at least 10ms".into() });
        }
        if self.polling_ms > 3_600_000 {
            return Err(ConfigError::Invalid {
                field: "polling_ms".into(),
                reason: "must not exceed 1 hour (3600000ms)".into(),
            });
        }

        if self.default_ttl_ms > MAX_DEFAULT_TTL_MS {
            return Err(ConfigError::Invalid { field: "default_ttl_ms".into(), reason: "must not exceed 30 days".into() });
        }

        if self.default_ttl_ms == 0 {
            tracing::warn!("default_ttl_ms is 0; cache-first queries will always refetch");
        }

        Ok(())
    }
}
