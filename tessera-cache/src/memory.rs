//! In-process cache backend.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// How often writes sweep the whole map for expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-memory cache backing the `memory` driver.
///
/// Expired entries are invisible to readers. A read that meets one drops
/// it, and the first write after each [`SWEEP_INTERVAL`] drops all of them,
/// so abandoned sessions do not accumulate.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    data: Arc<RwLock<Entries>>,
}

struct Entries {
    map: HashMap<String, CacheEntry>,
    next_sweep: Instant,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            next_sweep: Instant::now() + SWEEP_INTERVAL,
        }
    }
}

impl Entries {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live(now));
        self.next_sweep = now + SWEEP_INTERVAL;
        let removed = before - self.map.len();
        tracing::trace!(removed, "expired in-memory entries collected");
        removed
    }
}

#[derive(Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

impl InMemoryCache {
    /// Create new in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.data.write().await.sweep(Instant::now())
    }

    /// Remaining time-to-live of a key, `None` if absent or non-expiring.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let data = self.data.read().await;
        let now = Instant::now();
        data.map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.expires_at)
            .map(|exp| exp - now)
    }

    /// Number of stored entries, including expired ones not yet collected.
    pub async fn len(&self) -> usize {
        self.data.read().await.map.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.map.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let now = Instant::now();
        {
            let data = self.data.read().await;
            match data.map.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(entry.value.clone()),
                None => return Err(CacheError::NotFound(key.to_string())),
                Some(_) => {}
            }
        }

        // Stale: re-check under the write lock, a writer may have refreshed it.
        let mut data = self.data.write().await;
        match data.map.get(key) {
            Some(entry) if entry.is_live(now) => Ok(entry.value.clone()),
            Some(_) => {
                data.map.remove(key);
                Err(CacheError::NotFound(key.to_string()))
            }
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        let expires_at = (!ttl.is_zero()).then(|| now + ttl);
        let entry = CacheEntry { value, expires_at };

        let mut data = self.data.write().await;
        if now >= data.next_sweep {
            data.sweep(now);
        }
        data.map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.data.write().await.map.remove(key);
        Ok(())
    }
}
