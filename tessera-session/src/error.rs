//! Error types for session operations.

use tessera_cache::CacheError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session configuration was supplied or initialized
    #[error("config is nil")]
    NilConfig,

    /// The configuration has no store registry attached
    #[error("store is nil")]
    NilStore,

    /// The connection string has no `scheme:` part
    #[error("invalid store driver: connection string {0:?} has no scheme")]
    InvalidConnectionString(String),

    /// The connection string's scheme is not an allowed driver
    #[error("unsupported store driver: {0}")]
    UnsupportedDriver(String),

    /// The session record or the requested field does not exist
    #[error("session: nil")]
    NotFound,

    /// A value could not be encoded to or decoded from JSON
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The cache backend failed
    #[error("Backend error: {0}")]
    Backend(CacheError),
}

impl SessionError {
    /// Check whether this error means "nothing stored" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<CacheError> for SessionError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(_) => Self::NotFound,
            CacheError::Serialization(msg) | CacheError::Deserialization(msg) => {
                Self::Encoding(msg)
            }
            other => Self::Backend(other),
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
