//! Unified error types for sqlcache.
//!
//! Every variant renders with a stable code prefix so that callers and logs
//! can match on the failure class without parsing the message.

use tokio_rusqlite::rusqlite;

/// Unified error type for the cache and its data-store adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a table name with no usable characters).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The data-store adapter failed to run a statement.
    #[error("ADAPTER_ERROR: {0}")]
    Adapter(String),

    /// SQLite operation failed.
    #[error("DB_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Cache key components could not be serialized.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Rows could not be decoded into the requested type.
    #[error("DECODE_FAILED: {0}")]
    Decode(#[source] serde_json::Error),
}

impl Error {
    /// Stable code for the error class.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Adapter(_) => "ADAPTER_ERROR",
            Error::Database(_) => "DB_ERROR",
            Error::Serialize(_) => "SERIALIZE_FAILED",
            Error::Decode(_) => "DECODE_FAILED",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Adapter("connection refused".to_string());
        assert!(err.to_string().contains("ADAPTER_ERROR"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_code_matches_prefix() {
        let err = Error::InvalidInput("empty table name".to_string());
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(err.to_string().starts_with(err.code()));
    }

    #[test]
    fn test_rusqlite_error_maps_to_database() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), "DB_ERROR");
    }
}
