//! Helper functions for typed cache access.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Get a typed value from the cache.
///
/// A missing key is reported as [`CacheError::NotFound`].
pub async fn get<S: CacheStore + ?Sized, T: DeserializeOwned>(
    store: &S,
    key: &str,
) -> CacheResult<T> {
    let json = store.get(key).await?;
    serde_json::from_str(&json).map_err(|e| CacheError::Deserialization(e.to_string()))
}

/// Set a typed value in the cache.
pub async fn set<S: CacheStore + ?Sized, T: Serialize + ?Sized>(
    store: &S,
    key: &str,
    value: &T,
    ttl: Duration,
) -> CacheResult<()> {
    let json =
        serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    store.set(key, json, ttl).await
}

/// Get a typed value, treating a missing key as `None`.
pub async fn get_opt<S: CacheStore + ?Sized, T: DeserializeOwned>(
    store: &S,
    key: &str,
) -> CacheResult<Option<T>> {
    match get(store, key).await {
        Ok(value) => Ok(Some(value)),
        Err(CacheError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
