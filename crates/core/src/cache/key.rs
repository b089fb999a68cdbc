//! Versioned cache key derivation.
//!
//! Keys carry a scheme prefix so that a future derivation scheme can live
//! next to old entries without colliding with them.

use crate::Error;
use crate::adapter::Params;

/// Prefix of every key produced by the current scheme.
pub const KEY_PREFIX: &str = "v1:";

/// Database id used when the adapter does not report one.
pub const DEFAULT_DATABASE_ID: &str = "db";

/// Compute the cache key for a query.
///
/// With an override the key is `v1:<override>`, so structurally different
/// queries can deliberately share one entry. Otherwise it is
/// `v1:` followed by the JSON array `[database_id, sql, params]`.
pub fn compute_cache_key(
    database_id: &str, sql: &str, params: &Params, key_override: Option<&str>,
) -> Result<String, Error> {
    if let Some(key) = key_override {
        return Ok(versioned(key));
    }

    let raw = serde_json::to_string(&(database_id, sql, params)).map_err(Error::Serialize)?;
    Ok(versioned(&raw))
}

/// Apply the scheme prefix to a raw key.
pub fn versioned(raw: &str) -> String {
    format!("{KEY_PREFIX}{raw}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = compute_cache_key("db", "SELECT * FROM t WHERE id <= ?", &Params::from([2]), None).unwrap();
        let key2 = compute_cache_key("db", "SELECT * FROM t WHERE id <= ?", &Params::from([2]), None).unwrap();
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_format() {
        let key = compute_cache_key("db", "SELECT 1", &Params::from([1]), None).unwrap();
        assert_eq!(key, r#"v1:["db","SELECT 1",[1]]"#);

        let key = compute_cache_key("db", "SELECT 1", &Params::None, None).unwrap();
        assert_eq!(key, r#"v1:["db","SELECT 1",null]"#);
    }

    #[test]
    fn test_key_different_params() {
        let alice = compute_cache_key("db", "SELECT * FROM users WHERE name = ?", &Params::from(["Alice"]), None);
        let bob = compute_cache_key("db", "SELECT * FROM users WHERE name = ?", &Params::from(["Bob"]), None);
        assert_ne!(alice.unwrap(), bob.unwrap());
    }

    #[test]
    fn test_key_namespaced_by_database() {
        let a = compute_cache_key("a.sqlite", "SELECT 1", &Params::None, None).unwrap();
        let b = compute_cache_key("b.sqlite", "SELECT 1", &Params::None, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_override_aliases_queries() {
        let a = compute_cache_key("db", "SELECT * FROM products", &Params::None, Some("products:list")).unwrap();
        let b = compute_cache_key("db", "SELECT id FROM products", &Params::from([1]), Some("products:list")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "v1:products:list");
    }
}
