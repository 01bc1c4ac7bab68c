//! Read-through cache.
//!
//! [`ReadThroughCache::get_or_load`] consults the cache store first and
//! falls back to a loader on miss, writing the loaded value back with a TTL.
//! The loader is always the source of truth: nothing is ever written to the
//! cache that did not come from it.
//!
//! A broken cache store never breaks a read. Lookup failures, write failures
//! and undecodable entries are logged, counted as degraded, and the value is
//! served straight from the loader.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use ringtone_store::CacheStore;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to run the loader.
    pub misses: u64,
    /// Cache store errors absorbed (lookup, write-back, or decode).
    pub degraded: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache (0.0 to 1.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicU64,
}

/// TTL cache in front of an authoritative loader.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    counters: Arc<Counters>,
}

impl ReadThroughCache {
    /// Wrap a cache store.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Return the cached value for `key`, or run `loader` and cache its
    /// result for `ttl`.
    ///
    /// Loader errors are returned as-is and never cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut write_back = true;

        match self.store.get(key).await {
            Ok(Some(bytes)) => match ciborium::from_reader::<T, _>(bytes.as_slice()) {
                Ok(value) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(e) => {
                    self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                write_back = false;
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, loading directly");
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let value = loader().await?;

        if write_back {
            self.write_back(key, &value, ttl).await;
        }

        Ok(value)
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
        }
    }

    async fn write_back<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let mut buf = Vec::new();
        if let Err(e) = ciborium::into_writer(value, &mut buf) {
            self.counters.degraded.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %key, error = %e, "Failed to encode value for cache");
            return;
        }

        if let Err(e) = self.store.set(key, &buf, ttl).await {
            self.counters.degraded.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %key, error = %e, "Cache write-back failed");
        }
    }
}
