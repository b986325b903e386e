//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key does not exist (or has expired).
    ///
    /// Every backend reports a missing key through this variant so callers
    /// can tell "nothing stored" apart from a failing backend.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Memcached-specific error
    #[cfg(feature = "memcached")]
    #[error("Memcached error: {0}")]
    Memcached(#[from] memcache::MemcacheError),

    /// Embedded store error
    #[cfg(feature = "embedded")]
    #[error("Embedded store error: {0}")]
    Embedded(#[from] redb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid connection string for the selected driver
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Generic error
    #[error("Cache error: {0}")]
    Other(String),
}

impl CacheError {
    /// Check whether this error is the "no such key" sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_sentinel() {
        assert!(CacheError::NotFound("session_1".to_string()).is_not_found());
        assert!(!CacheError::Connection("refused".to_string()).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::Connection("Failed to connect".to_string());
        assert!(err.to_string().contains("Failed to connect"));

        let err = CacheError::NotFound("session_abc".to_string());
        assert_eq!(err.to_string(), "Key not found: session_abc");
    }
}
