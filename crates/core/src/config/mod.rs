//! Cache configuration.
//!
//! Values are layered with figment; later sources override earlier ones:
//! built-in defaults, then the TOML file named by `SQLCACHE_CONFIG_FILE`,
//! then `SQLCACHE_*` environment variables.

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Query cache configuration.
///
/// Nested keys are separated by `__` in environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in milliseconds when a query does not override it.
    ///
    /// Set via SQLCACHE_DEFAULT_TTL_MS environment variable.
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,

    /// Eviction store limits.
    #[serde(default)]
    pub lru: LruConfig,

    /// Whether to poll the store for changes and wipe the cache when it mutates.
    ///
    /// Set via SQLCACHE_WATCH_CHANGES environment variable.
    #[serde(default = "default_true")]
    pub watch_changes: bool,

    /// Interval between mutation-counter polls in milliseconds.
    ///
    /// Set via SQLCACHE_POLLING_MS environment variable.
    #[serde(default = "default_polling_ms")]
    pub polling_ms: u64,

    /// Emit diagnostic events for every query and invalidation.
    ///
    /// Set via SQLCACHE_VERBOSE environment variable.
    #[serde(default)]
    pub verbose: bool,
}

/// Eviction store limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LruConfig {
    /// Maximum number of live entries.
    ///
    /// Set via SQLCACHE_LRU__MAX_ITEMS environment variable.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_ttl_ms() -> u64 {
    15_000
}

fn default_max_items() -> usize {
    5_000
}

fn default_polling_ms() -> u64 {
    1_500
}

fn default_true() -> bool {
    true
}

impl Default for LruConfig {
    fn default() -> Self {
        Self { max_items: default_max_items() }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: default_ttl_ms(),
            lru: LruConfig::default(),
            watch_changes: true,
            polling_ms: default_polling_ms(),
            verbose: false,
        }
    }
}

impl CacheConfig {
    /// Default TTL as Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    /// Polling interval as Duration.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_ms)
    }

    /// Load and validate the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadFailed` when the file or an environment value
    /// does not parse, and `ConfigError::Invalid` when a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SQLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SQLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl_ms, 15_000);
        assert_eq!(config.lru.max_items, 5_000);
        assert!(config.watch_changes);
        assert_eq!(config.polling_ms, 1_500);
        assert!(!config.verbose);
    }

    #[test]
    fn test_durations() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl(), Duration::from_millis(15_000));
        assert_eq!(config.polling_interval(), Duration::from_millis(1_500));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CacheConfig = Figment::from(Serialized::defaults(CacheConfig::default()))
            .merge(Toml::string("polling_ms = 250\n[lru]\nmax_items = 10\n"))
            .extract()
            .unwrap();

        assert_eq!(config.polling_ms, 250);
        assert_eq!(config.lru.max_items, 10);
        assert_eq!(config.default_ttl_ms, 15_000);
        assert!(config.watch_changes);
    }
}
