//! Memcached cache implementation.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use chrono::Utc;
use tracing::debug;

/// Longest expiration Memcached treats as relative: 30 days.
pub const MAX_RELATIVE_EXPIRATION: u32 = 60 * 60 * 24 * 30;

/// Memcached store backing the `memcached` driver.
///
/// The `memcache` client is blocking; every operation runs on the blocking
/// pool behind a shared lock.
#[derive(Clone)]
pub struct MemcachedCache {
    client: Arc<Mutex<memcache::Client>>,
}

impl MemcachedCache {
    /// Connect to a Memcached server.
    ///
    /// Accepts `memcached://host:port`, `memcache://host:port` or a bare
    /// `host:port`.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let server_url = Self::parse_memcached_url(url)?;

        let client = tokio::task::spawn_blocking(move || memcache::connect(server_url.as_str()))
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to spawn task: {}", e)))?
            .map_err(|e| CacheError::Connection(format!("Failed to connect: {}", e)))?;

        debug!("connected to memcached");
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
        })
    }

    /// Normalize a connection string to the `memcache://` form the client expects.
    fn parse_memcached_url(url: &str) -> CacheResult<String> {
        if let Some(rest) = url.strip_prefix("memcached://") {
            Ok(format!("memcache://{}", rest))
        } else if url.starts_with("memcache://") {
            Ok(url.to_string())
        } else if url.contains(':') && !url.contains("://") {
            Ok(format!("memcache://{}", url))
        } else {
            Err(CacheError::InvalidUrl(format!(
                "Invalid Memcached URL: {}. Expected format: 'memcached://host:port' or 'host:port'",
                url
            )))
        }
    }

    /// Convert a ttl to a Memcached expiration (0 = never).
    ///
    /// Memcached reads values above [`MAX_RELATIVE_EXPIRATION`] as absolute
    /// Unix times, so longer ttls are sent as `now_unix + ttl`.
    fn duration_to_expiration(ttl: Duration, now_unix: i64) -> u32 {
        if ttl.is_zero() {
            return 0;
        }

        let secs = ttl.as_secs().max(1);
        if secs <= u64::from(MAX_RELATIVE_EXPIRATION) {
            return secs as u32;
        }

        let deadline = u64::try_from(now_unix).unwrap_or(0).saturating_add(secs);
        u32::try_from(deadline).unwrap_or(u32::MAX)
    }

    /// Run one client call on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T, memcache::MemcacheError> + Send + 'static,
    {
        let client = self.client.clone();
        let result = tokio::task::spawn_blocking(move || op(&client.blocking_lock()))
            .await
            .map_err(|e| CacheError::Other(format!("memcached task failed: {}", e)))?;

        Ok(result?)
    }
}

#[async_trait]
impl CacheStore for MemcachedCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let owned_key = key.to_string();
        let value = self
            .blocking(move |client| client.get::<String>(&owned_key))
            .await?;

        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let key = key.to_string();
        let expiration = Self::duration_to_expiration(ttl, Utc::now().timestamp());

        self.blocking(move |client| client.set(&key, value.as_str(), expiration))
            .await
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let key = key.to_string();

        // A missing key reports `false`; removal is idempotent either way.
        self.blocking(move |client| client.delete(&key)).await?;
        Ok(())
    }
}
