//! Expiring cache in front of provider calls.
//!
//! Entries are immutable `ProviderResult`s with an absolute expiry. Expiry is
//! checked on read; an expired entry is removed and reported as a miss. The
//! memory backend can additionally be swept periodically.

use anyhow::{Result, anyhow};
use fjall::Keyspace;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tokio::task;

use crate::error::TravelError;
use crate::models::ProviderResult;

const GENERATION_KEY: &str = "meta:generation";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    value: ProviderResult,
    expires_at: u64, // Unix timestamp (milliseconds)
}

impl StoredEntry {
    fn is_fresh(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Hit/miss counters and size of the cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    /// Live entry count; not tracked by the persistent backend
    pub entries: Option<usize>,
    pub hit_rate: f64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

/// fjall keyspace holding postcard-encoded entries.
///
/// Keys are prefixed with a generation number; clearing bumps the generation
/// so older entries become unreachable.
struct PersistentStore {
    store: Keyspace,
    generation: AtomicU64,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl PersistentStore {
    fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let store = db.keyspace("cache", fjall::KeyspaceCreateOptions::default)?;
        let generation = match get_from_store(store.clone(), GENERATION_KEY.as_bytes().to_vec())? {
            Some(bytes) => postcard::from_bytes(&bytes)?,
            None => 0,
        };
        Ok(Self {
            store,
            generation: AtomicU64::new(generation),
        })
    }

    fn scoped_key(&self, key: &str) -> Vec<u8> {
        format!("{}/{key}", self.generation.load(Ordering::Acquire)).into_bytes()
    }

    async fn get(&self, key: &str) -> Result<Option<StoredEntry>> {
        let store = self.store.clone();
        let key = self.scoped_key(key);
        let maybe_bytes = task::spawn_blocking(move || get_from_store(store, key)).await??;
        match maybe_bytes {
            Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, entry: &StoredEntry) -> Result<()> {
        let store = self.store.clone();
        let key = self.scoped_key(key);
        let bytes = postcard::to_stdvec(entry)?;
        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let store = self.store.clone();
        let key = self.scoped_key(key);
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let next = self.generation.load(Ordering::Acquire) + 1;
        let store = self.store.clone();
        let bytes = postcard::to_stdvec(&next)?;
        task::spawn_blocking(move || store.insert(GENERATION_KEY.as_bytes().to_vec(), bytes))
            .await??;
        self.generation.store(next, Ordering::Release);
        Ok(())
    }
}

enum Backend {
    Memory(RwLock<HashMap<String, StoredEntry>>),
    Persistent(PersistentStore),
}

/// Process-wide cache of provider outcomes, shared through an `Arc`
pub struct ExpiringCache {
    backend: Backend,
    counters: Counters,
}

fn now_millis() -> Result<u64> {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    Ok(u64::try_from(millis)?)
}

/// Spread a TTL by up to `±jitter` so entries written together expire apart
#[must_use]
pub fn jittered(ttl: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return ttl;
    }
    let factor: f64 = rand::rng().random_range((1.0 - jitter)..(1.0 + jitter));
    ttl.mul_f64(factor)
}

impl ExpiringCache {
    /// In-memory cache
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(HashMap::new())),
            counters: Counters::default(),
        }
    }

    /// Cache persisted in a fjall database at `path`
    pub fn persistent(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            backend: Backend::Persistent(PersistentStore::open(path)?),
            counters: Counters::default(),
        })
    }

    /// Backend chosen from an optional store location
    pub fn from_location(location: Option<&str>) -> Result<Self> {
        match location {
            Some(path) => Self::persistent(path),
            None => Ok(Self::in_memory()),
        }
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Persistent(_) => "persistent",
        }
    }

    /// Retrieves a result if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<ProviderResult>, TravelError> {
        match self.lookup(key).await {
            Ok(Some(value)) => {
                tracing::debug!("Key found and still fresh");
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                Err(TravelError::cache(e.to_string()))
            }
        }
    }

    async fn lookup(&self, key: &str) -> Result<Option<ProviderResult>> {
        let now = now_millis()?;
        let entry = match &self.backend {
            Backend::Memory(map) => map.read().await.get(key).cloned(),
            Backend::Persistent(store) => store.get(key).await?,
        };

        let Some(entry) = entry else {
            tracing::debug!("Key not found");
            return Ok(None);
        };

        if entry.is_fresh(now) {
            return Ok(Some(entry.value));
        }

        tracing::debug!("Key found but expired");
        match &self.backend {
            Backend::Memory(map) => {
                let mut map = map.write().await;
                // a concurrent put may have replaced the entry meanwhile
                if map.get(key).is_some_and(|e| !e.is_fresh(now)) {
                    map.remove(key);
                }
            }
            Backend::Persistent(store) => store.remove(key).await?,
        }
        Ok(None)
    }

    /// Stores a result with a time-to-live, overwriting any existing entry
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub async fn put(
        &self,
        key: &str,
        value: ProviderResult,
        ttl: Duration,
    ) -> Result<(), TravelError> {
        let result = self.store(key, value, ttl).await;
        if result.is_err() {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
        result.map_err(|e| TravelError::cache(e.to_string()))
    }

    async fn store(&self, key: &str, value: ProviderResult, ttl: Duration) -> Result<()> {
        let ttl_millis = u64::try_from(ttl.as_millis())?;
        let expires_at = now_millis()?
            .checked_add(ttl_millis)
            .ok_or(anyhow!("TTL overflow"))?;
        let entry = StoredEntry { value, expires_at };
        match &self.backend {
            Backend::Memory(map) => {
                map.write().await.insert(key.to_string(), entry);
            }
            Backend::Persistent(store) => store.put(key, &entry).await?,
        }
        Ok(())
    }

    /// Drop every entry
    pub async fn clear(&self) -> Result<(), TravelError> {
        match &self.backend {
            Backend::Memory(map) => {
                map.write().await.clear();
                Ok(())
            }
            Backend::Persistent(store) => store
                .clear()
                .await
                .map_err(|e| TravelError::cache(e.to_string())),
        }
    }

    /// Remove expired entries; returns how many were dropped.
    /// The persistent backend relies on lazy expiry only.
    pub async fn sweep_expired(&self) -> Result<usize, TravelError> {
        let now = now_millis().map_err(|e| TravelError::cache(e.to_string()))?;
        match &self.backend {
            Backend::Memory(map) => {
                let mut map = map.write().await;
                let before = map.len();
                map.retain(|_, entry| entry.is_fresh(now));
                Ok(before - map.len())
            }
            Backend::Persistent(_) => Ok(0),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let entries = match &self.backend {
            Backend::Memory(map) => Some(map.read().await.len()),
            Backend::Persistent(_) => None,
        };
        CacheStats {
            backend: self.backend_name(),
            hits,
            misses,
            errors: self.counters.errors.load(Ordering::Relaxed),
            entries,
            #[allow(clippy::cast_precision_loss)]
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

/// Periodically sweep expired entries until the task is dropped
pub fn spawn_sweeper(
    cache: std::sync::Arc<ExpiringCache>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match cache.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!("Swept {} expired cache entries", removed),
                Err(e) => tracing::warn!("Cache sweep failed: {}", e),
            }
        }
    })
}
