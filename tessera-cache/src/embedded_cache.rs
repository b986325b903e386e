//! Embedded cache implementation on redb.

use crate::error::{CacheError, CacheResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, Table, TableDefinition, TableError};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Entries keyed by cache key: (deadline in Unix millis, 0 = never; value).
const ENTRIES: TableDefinition<&str, (i64, &str)> = TableDefinition::new("tessera_cache");

/// How often writes sweep the table for expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Embedded store backing the `embedded` driver.
///
/// Connection strings name a database file, or `:memory:` for a
/// process-local database:
///
/// ```text
/// embedded:///var/lib/app/sessions.redb
/// embedded://:memory:
/// ```
///
/// redb is synchronous, so every operation runs on the blocking pool.
/// Expired entries are dropped when read and swept by the first write after
/// each [`SWEEP_INTERVAL`].
#[derive(Clone)]
pub struct EmbeddedCache {
    db: Arc<Database>,
    next_sweep_ms: Arc<AtomicI64>,
}

#[derive(Debug, PartialEq)]
enum Location {
    Memory,
    File(PathBuf),
}

impl EmbeddedCache {
    /// Open (or create) the database named by `conn`.
    pub async fn open(conn: &str) -> CacheResult<Self> {
        let location = Self::parse_location(conn)?;

        let db = tokio::task::spawn_blocking(move || match location {
            Location::Memory => Database::builder()
                .create_with_backend(redb::backends::InMemoryBackend::new()),
            Location::File(path) => Database::create(path),
        })
        .await
        .map_err(|e| CacheError::Other(format!("embedded task failed: {}", e)))?
        .map_err(|e| CacheError::Connection(e.to_string()))?;

        debug!("opened embedded store");
        Ok(Self {
            db: Arc::new(db),
            next_sweep_ms: Arc::new(AtomicI64::new(now_ms().saturating_add(sweep_interval_ms()))),
        })
    }

    fn parse_location(conn: &str) -> CacheResult<Location> {
        let (_, rest) = conn.split_once("://").ok_or_else(|| {
            CacheError::InvalidUrl(format!(
                "Invalid embedded store URL: {}. Expected 'embedded://<path>' or 'embedded://:memory:'",
                conn
            ))
        })?;

        match rest {
            "" => Err(CacheError::InvalidUrl(format!(
                "Missing database path in '{}'",
                conn
            ))),
            ":memory:" => Ok(Location::Memory),
            path => Ok(Location::File(PathBuf::from(path))),
        }
    }

    /// Drop expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> CacheResult<usize> {
        let now = now_ms();
        let removed = self
            .blocking(move |db| {
                let txn = db.begin_write()?;
                let removed = {
                    let mut table = txn.open_table(ENTRIES)?;
                    sweep(&mut table, now)?
                };
                txn.commit()?;
                Ok(removed)
            })
            .await?;

        self.next_sweep_ms
            .store(now.saturating_add(sweep_interval_ms()), Ordering::Relaxed);
        tracing::trace!(removed, "expired embedded entries collected");
        Ok(removed)
    }

    /// Number of stored entries, including expired ones not yet collected.
    pub async fn len(&self) -> CacheResult<usize> {
        self.blocking(|db| {
            let txn = db.begin_read()?;
            let table = match txn.open_table(ENTRIES) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(0),
                Err(e) => return Err(e.into()),
            };
            let mut count = 0;
            for entry in table.iter()? {
                entry?;
                count += 1;
            }
            Ok(count)
        })
        .await
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Claim the next periodic sweep if it is due.
    fn sweep_due(&self, now: i64) -> bool {
        let next = self.next_sweep_ms.load(Ordering::Relaxed);
        now >= next
            && self
                .next_sweep_ms
                .compare_exchange(
                    next,
                    now.saturating_add(sweep_interval_ms()),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
    }

    /// Run one database call on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, redb::Error> + Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| CacheError::Other(format!("embedded task failed: {}", e)))?;

        Ok(result?)
    }
}

#[async_trait]
impl CacheStore for EmbeddedCache {
    async fn get(&self, key: &str) -> CacheResult<String> {
        let now = now_ms();
        let owned_key = key.to_string();

        let found = self
            .blocking(move |db| {
                let txn = db.begin_read()?;
                let table = match txn.open_table(ENTRIES) {
                    Ok(table) => table,
                    Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                let entry = table.get(owned_key.as_str())?.map(|guard| {
                    let (expires_at, value) = guard.value();
                    (expires_at, value.to_string())
                });
                Ok(entry)
            })
            .await?;

        match found {
            Some((expires_at, value)) if is_live(expires_at, now) => Ok(value),
            Some(_) => {
                self.remove(key).await?;
                Err(CacheError::NotFound(key.to_string()))
            }
            None => Err(CacheError::NotFound(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let now = now_ms();
        let expires_at = if ttl.is_zero() {
            0
        } else {
            now.saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
        };
        let sweep_now = self.sweep_due(now);
        let key = key.to_string();

        let removed = self
            .blocking(move |db| {
                let txn = db.begin_write()?;
                let removed = {
                    let mut table = txn.open_table(ENTRIES)?;
                    let removed = if sweep_now { sweep(&mut table, now)? } else { 0 };
                    table.insert(key.as_str(), (expires_at, value.as_str()))?;
                    removed
                };
                txn.commit()?;
                Ok(removed)
            })
            .await?;

        if sweep_now {
            tracing::trace!(removed, "expired embedded entries collected");
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        let key = key.to_string();

        self.blocking(move |db| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(ENTRIES)?;
                table.remove(key.as_str())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn sweep_interval_ms() -> i64 {
    i64::try_from(SWEEP_INTERVAL.as_millis()).unwrap_or(i64::MAX)
}

fn is_live(expires_at: i64, now: i64) -> bool {
    expires_at == 0 || expires_at > now
}

fn sweep(
    table: &mut Table<'_, &'static str, (i64, &'static str)>,
    now: i64,
) -> Result<usize, redb::Error> {
    let mut stale = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        let (expires_at, _) = value.value();
        if !is_live(expires_at, now) {
            stale.push(key.value().to_string());
        }
    }

    for key in &stale {
        table.remove(key.as_str())?;
    }
    Ok(stale.len())
}
