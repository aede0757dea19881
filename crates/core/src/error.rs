//! Unified error types for reqcache.

use crate::transport::TransportError;

/// Unified error type for cache, store and transport failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network call failed and no stale fallback applied.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored or outgoing header map could not be (de)serialized.
    #[error("CACHE_ERROR: header serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// A thread panicked while holding the session lock.
    #[error("CACHE_ERROR: session lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Whether this error came from the network collaborator.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("INVALID_URL"));
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_transport_error_is_verbatim() {
        let err: Error = TransportError::Timeout("read timed out".into()).into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), TransportError::Timeout("read timed out".into()).to_string());
    }

    #[test]
    fn test_database_error_conversion() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(!err.is_transport());
    }
}
