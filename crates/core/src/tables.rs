//! Heuristic table extraction from query text.
//!
//! Looks for `FROM`, `JOIN`, `UPDATE` and `INTO` followed by an identifier.
//! This is not a parser: subqueries, CTE names, quoted identifiers and
//! keywords inside comments or string literals can all over- or under-match.
//! The result is only a default for tagging entries; callers that know
//! better pass their own table list.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static TABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:from|join|update|into)\s+([a-z0-9_.]+)").expect("valid table regex"));

/// Extract the lowercased, deduplicated set of tables a query appears to touch.
///
/// Schema-qualified names keep their prefix (`main.users`).
///
/// # Examples
///
/// ```
/// use sqlcache_core::extract_tables;
///
/// let tables = extract_tables("SELECT * FROM users JOIN posts ON users.id = posts.user_id");
/// assert!(tables.contains("users") && tables.contains("posts"));
/// ```
pub fn extract_tables(sql: &str) -> BTreeSet<String> {
    TABLE_REF
        .captures_iter(sql)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Lowercase and deduplicate caller-supplied table names.
pub fn normalize_tables<I, S>(tables: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tables
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}
