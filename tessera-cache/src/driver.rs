//! Driver descriptors: a driver name plus the factory that opens a backend.

use crate::error::CacheResult;
use crate::memory::InMemoryCache;
use crate::traits::SharedCache;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Opens a backend from a full connection string.
pub type CacheFactory = Arc<dyn Fn(&str) -> BoxFuture<'static, CacheResult<SharedCache>> + Send + Sync>;

/// Case-insensitive name of a backend family, stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverName(String);

impl DriverName {
    /// In-process memory store (`memory:`).
    pub const MEMORY: &'static str = "memory";
    /// Single Redis server (`redis://host:port`).
    pub const REDIS: &'static str = "redis";
    /// Redis Cluster (`redis-cluster://host:port?addr=...`).
    pub const REDIS_CLUSTER: &'static str = "redis-cluster";
    /// Memcached server (`memcached://host:port`).
    pub const MEMCACHED: &'static str = "memcached";
    /// Embedded database file or `:memory:` (`embedded://path`).
    pub const EMBEDDED: &'static str = "embedded";

    /// Create a driver name; the name is folded to lower case.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    /// The canonical (lower-cased) name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DriverName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A named backend family and how to open it.
#[derive(Clone)]
pub struct Driver {
    name: DriverName,
    factory: CacheFactory,
}

impl Driver {
    /// Create a driver from a name and a factory.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use tessera_cache::{Driver, InMemoryCache, SharedCache};
    ///
    /// let driver = Driver::new("scratch", |_conn: &str| {
    ///     Box::pin(async { Ok(Arc::new(InMemoryCache::new()) as SharedCache) })
    /// });
    /// assert_eq!(driver.name().as_str(), "scratch");
    /// ```
    pub fn new<F>(name: impl AsRef<str>, factory: F) -> Self
    where
        F: Fn(&str) -> BoxFuture<'static, CacheResult<SharedCache>> + Send + Sync + 'static,
    {
        Self {
            name: DriverName::new(name),
            factory: Arc::new(factory),
        }
    }

    /// The in-memory driver. Every distinct connection string gets its own store.
    pub fn memory() -> Self {
        Self::new(DriverName::MEMORY, |_conn: &str| Box::pin(open_memory()))
    }

    /// The Redis driver.
    #[cfg(feature = "redis")]
    pub fn redis() -> Self {
        Self::new(DriverName::REDIS, |conn: &str| Box::pin(open_redis(conn.to_string())))
    }

    /// The Redis Cluster driver.
    #[cfg(feature = "redis-cluster")]
    pub fn redis_cluster() -> Self {
        Self::new(DriverName::REDIS_CLUSTER, |conn: &str| {
            Box::pin(open_redis_cluster(conn.to_string()))
        })
    }

    /// The Memcached driver.
    #[cfg(feature = "memcached")]
    pub fn memcached() -> Self {
        Self::new(DriverName::MEMCACHED, |conn: &str| {
            Box::pin(open_memcached(conn.to_string()))
        })
    }

    /// The embedded (redb) driver.
    #[cfg(feature = "embedded")]
    pub fn embedded() -> Self {
        Self::new(DriverName::EMBEDDED, |conn: &str| {
            Box::pin(open_embedded(conn.to_string()))
        })
    }

    /// The driver's name.
    pub fn name(&self) -> &DriverName {
        &self.name
    }

    /// The driver's factory.
    pub fn factory(&self) -> &CacheFactory {
        &self.factory
    }

    /// Open a backend for `conn`.
    pub async fn open(&self, conn: &str) -> CacheResult<SharedCache> {
        (self.factory)(conn).await
    }

    /// Split into name and factory.
    pub fn into_parts(self) -> (DriverName, CacheFactory) {
        (self.name, self.factory)
    }
}

async fn open_memory() -> CacheResult<SharedCache> {
    Ok(Arc::new(InMemoryCache::new()))
}

#[cfg(feature = "redis")]
async fn open_redis(conn: String) -> CacheResult<SharedCache> {
    let cache = crate::redis_cache::RedisCache::connect(&conn).await?;
    Ok(Arc::new(cache))
}

#[cfg(feature = "redis-cluster")]
async fn open_redis_cluster(conn: String) -> CacheResult<SharedCache> {
    let cache = crate::redis_cluster_cache::RedisClusterCache::connect(&conn).await?;
    Ok(Arc::new(cache))
}

#[cfg(feature = "memcached")]
async fn open_memcached(conn: String) -> CacheResult<SharedCache> {
    let cache = crate::memcached_cache::MemcachedCache::connect(&conn).await?;
    Ok(Arc::new(cache))
}

#[cfg(feature = "embedded")]
async fn open_embedded(conn: String) -> CacheResult<SharedCache> {
    let cache = crate::embedded_cache::EmbeddedCache::open(&conn).await?;
    Ok(Arc::new(cache))
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver").field("name", &self.name).finish_non_exhaustive()
    }
}
