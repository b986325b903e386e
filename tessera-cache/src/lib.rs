//! Cache backends for Tessera sessions.
//!
//! Every backend is exposed through one small capability, [`CacheStore`]:
//! `get` / `set` with a time-to-live / `remove`, with a distinguished
//! [`CacheError::NotFound`] outcome. Backends are opened from connection
//! strings by [`Driver`] factories, which the session store registry keys
//! by scheme.
//!
//! # Features
//!
//! - `redis` - Redis backend (enabled by default)
//! - `redis-cluster` - Redis Cluster backend
//! - `memcached` - Memcached backend (requires opt-in)
//! - `embedded` - Embedded redb backend, on disk or in memory
//!
//! The in-memory backend is always available.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use tessera_cache::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), CacheError> {
//! let cache = Driver::memory().open("memory:").await?;
//!
//! cache.set("greeting", "\"hello\"".to_string(), Duration::from_secs(60)).await?;
//! let greeting: String = tessera_cache::get(cache.as_ref(), "greeting").await?;
//! assert_eq!(greeting, "hello");
//!
//! cache.remove("greeting").await?;
//! assert!(cache.get("greeting").await.unwrap_err().is_not_found());
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod error;
pub mod helpers;
pub mod memory;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis_cache;

#[cfg(feature = "redis-cluster")]
pub mod redis_cluster_cache;

#[cfg(feature = "memcached")]
pub mod memcached_cache;

#[cfg(feature = "embedded")]
pub mod embedded_cache;

pub use driver::{CacheFactory, Driver, DriverName};
pub use error::{CacheError, CacheResult};
pub use helpers::*;
pub use memory::InMemoryCache;
pub use traits::{CacheStore, SharedCache};

#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

#[cfg(feature = "redis-cluster")]
pub use redis_cluster_cache::RedisClusterCache;

#[cfg(feature = "memcached")]
pub use memcached_cache::MemcachedCache;

#[cfg(feature = "embedded")]
pub use embedded_cache::EmbeddedCache;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::driver::{CacheFactory, Driver, DriverName};
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::memory::InMemoryCache;
    pub use crate::traits::{CacheStore, SharedCache};

    #[cfg(feature = "redis")]
    pub use crate::redis_cache::RedisCache;

    #[cfg(feature = "redis-cluster")]
    pub use crate::redis_cluster_cache::RedisClusterCache;

    #[cfg(feature = "memcached")]
    pub use crate::memcached_cache::MemcachedCache;

    #[cfg(feature = "embedded")]
    pub use crate::embedded_cache::EmbeddedCache;
}
