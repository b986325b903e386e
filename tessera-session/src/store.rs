//! Driver registry: turns connection strings into shared cache handles.

use crate::error::{SessionError, SessionResult};
use std::collections::HashMap;
use tessera_cache::{CacheFactory, Driver, DriverName, SharedCache};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Session store registry.
///
/// A `Store` is built with a fixed set of allowed drivers. Each distinct
/// connection string is opened at most once; later requests for the same
/// string share that handle for the lifetime of the store. Handles are never
/// evicted, so connection strings are expected to be few (one per logical
/// backend).
///
/// # Examples
///
/// ```
/// use tessera_session::{Driver, Store};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tessera_session::SessionError> {
/// let store = Store::new([Driver::memory()]);
///
/// let a = store.resolve("memory:").await?;
/// let b = store.resolve("MEMORY:").await?;
/// assert!(!std::sync::Arc::ptr_eq(&a, &b)); // different strings, different handles
///
/// let c = store.resolve("memory:").await?;
/// assert!(std::sync::Arc::ptr_eq(&a, &c));
/// # Ok(())
/// # }
/// ```
pub struct Store {
    drivers: HashMap<DriverName, CacheFactory>,
    caches: RwLock<HashMap<String, SharedCache>>,
}

impl Store {
    /// Create a store allowing the given drivers.
    ///
    /// A later driver with the same (case-insensitive) name replaces an
    /// earlier one.
    pub fn new(drivers: impl IntoIterator<Item = Driver>) -> Self {
        Self {
            drivers: drivers.into_iter().map(Driver::into_parts).collect(),
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a connection string to a shared cache handle.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidConnectionString`] if `conn` has no `:`
    /// - [`SessionError::UnsupportedDriver`] if its scheme is not allowed
    /// - [`SessionError::Backend`] if the backend could not be opened; the
    ///   failure is not remembered and the next call retries
    ///
    /// The write lock is held while a new backend is opened. The lock is
    /// fair, so until that open finishes or fails, lookups of connection
    /// strings that are already open wait behind it as well. A slow or
    /// unreachable backend therefore stalls every caller of this store for
    /// the length of its connect attempt.
    pub async fn resolve(&self, conn: &str) -> SessionResult<SharedCache> {
        if let Some(cache) = self.caches.read().await.get(conn) {
            return Ok(cache.clone());
        }

        let factory = self.factory_for(conn)?;

        // Holding the write lock across construction collapses concurrent
        // first uses of `conn` into a single backend.
        let mut caches = self.caches.write().await;
        if let Some(cache) = caches.get(conn) {
            return Ok(cache.clone());
        }

        debug!(conn, "opening session cache backend");
        let cache = factory(conn).await.map_err(|e| {
            warn!(conn, error = %e, "failed to open session cache backend");
            SessionError::Backend(e)
        })?;
        caches.insert(conn.to_string(), cache.clone());

        Ok(cache)
    }

    /// Alias of [`Store::resolve`].
    pub async fn new_cache(&self, conn: &str) -> SessionResult<SharedCache> {
        self.resolve(conn).await
    }

    /// Names of the allowed drivers, sorted.
    pub fn drivers(&self) -> Vec<&DriverName> {
        let mut names: Vec<_> = self.drivers.keys().collect();
        names.sort();
        names
    }

    /// Whether a driver name is allowed (case-insensitive).
    pub fn supports(&self, name: &str) -> bool {
        self.drivers.contains_key(&DriverName::new(name))
    }

    /// Number of handles opened so far.
    pub async fn len(&self) -> usize {
        self.caches.read().await.len()
    }

    /// Whether no handle has been opened yet.
    pub async fn is_empty(&self) -> bool {
        self.caches.read().await.is_empty()
    }

    fn factory_for(&self, conn: &str) -> SessionResult<CacheFactory> {
        let (scheme, _) = conn
            .split_once(':')
            .ok_or_else(|| SessionError::InvalidConnectionString(conn.to_string()))?;

        self.drivers
            .get(&DriverName::new(scheme))
            .cloned()
            .ok_or_else(|| SessionError::UnsupportedDriver(scheme.to_string()))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("drivers", &self.drivers())
            .finish_non_exhaustive()
    }
}
