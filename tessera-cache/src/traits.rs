//! Cache store trait definition.

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A live cache handle shared between every user of one connection string.
pub type SharedCache = Arc<dyn CacheStore>;

/// Cache store trait for different cache backends.
///
/// Values are opaque text blobs; encoding them is the caller's concern.
/// A `ttl` of [`Duration::ZERO`] stores the value without expiration.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value from the cache.
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    ///
    /// # Returns
    ///
    /// Returns the stored value, [`CacheError::NotFound`] if the key is
    /// absent or expired, or any other error if the backend fails.
    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Set a value in the cache.
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    /// * `value` - The value to store
    /// * `ttl` - Time-to-live; zero means no expiration
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Remove a key from the cache. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> CacheResult<()>;

    /// Check if a key exists in the cache.
    async fn exists(&self, key: &str) -> CacheResult<bool> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(CacheError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
