//! Redis Cluster cache implementation.

use crate::error::{CacheError, CacheResult};
use crate::redis_cache::set_with_ttl;
use crate::traits::CacheStore;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Redis Cluster store backing the `redis-cluster` driver.
///
/// Connection strings name one seed node in the authority and any further
/// seeds as repeated `addr` query parameters:
///
/// ```text
/// redis-cluster://127.0.0.1:7001?addr=127.0.0.1:7002&addr=127.0.0.1:7003
/// ```
#[derive(Clone)]
pub struct RedisClusterCache {
    connection: ClusterConnection,
}

impl RedisClusterCache {
    /// Connect to the cluster described by `conn`.
    pub async fn connect(conn: &str) -> CacheResult<Self> {
        let nodes = Self::parse_nodes(conn)?;
        let seeds = nodes.len();

        let client =
            ClusterClient::new(nodes).map_err(|e| CacheError::Connection(e.to_string()))?;
        let connection = client
            .get_async_connection()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        debug!(seeds, "connected to redis cluster");
        Ok(Self { connection })
    }

    /// Expand a `redis-cluster://` connection string into seed node URLs.
    fn parse_nodes(conn: &str) -> CacheResult<Vec<String>> {
        let url = Url::parse(conn).map_err(|e| CacheError::InvalidUrl(e.to_string()))?;

        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
            CacheError::InvalidUrl(format!("Missing cluster seed host in '{}'", conn))
        })?;
        let port = url.port().unwrap_or(6379);

        let mut nodes = vec![format!("redis://{}:{}", host, port)];
        nodes.extend(
            url.query_pairs()
                .filter(|(name, _)| name == "addr")
                .map(|(_, addr)| format!("redis://{}", addr)),
        );

        Ok(nodes)
    }
}

#[async_trait]
impl CacheStore for RedisClusterCache {
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
