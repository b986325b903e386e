//! Redis cache implementation.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::debug;

/// Redis cache store backing the `redis` driver.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to a Redis server.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1:6379/0")
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tessera_cache::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), CacheError> {
    ///     let cache = RedisCache::connect("redis://localhost:6379").await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        debug!("connected to redis");
        Ok(Self { connection })
    }

    /// Get the underlying connection manager.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(key).await?;
        value.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        set_with_ttl(&mut conn, key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// `SET`/`SET EX` shared by the single-node and cluster stores.
pub(crate) async fn set_with_ttl<C>(
    conn: &mut C,
    key: &str,
    value: String,
    ttl: Duration,
) -> CacheResult<()>
where
    C: redis::aio::ConnectionLike + Send + Sync,
{
    if ttl.is_zero() {
        let _: () = conn.set(key, value).await?;
    } else {
        // Sub-second ttls round up so the key is never stored without expiry.
        let ttl_seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
    }
    Ok(())
}
