//! `RocksDB` cache store.
//!
//! Entries are CBOR-encoded with their absolute expiry time. `RocksDB` has
//! no per-key TTL, so expired entries are deleted lazily when read. Entries
//! that fail to decode are deleted the same way and reported as absent.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::CacheStore;

/// Column family holding cache entries, keyed by the UTF-8 cache key.
pub const CACHE_ENTRIES: &str = "cache_entries";

#[derive(Serialize, Deserialize)]
struct CachedBlob {
    expires_at: DateTime<Utc>,
    value: Vec<u8>,
}

/// RocksDB-backed cache store.
pub struct RocksCache {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksCache {
    /// Open or create a cache database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CACHE_ENTRIES, Options::default());
        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, vec![cf])
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(CACHE_ENTRIES)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {CACHE_ENTRIES}")))
    }
}

#[async_trait]
impl CacheStore for RocksCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.cf()?;
        let Some(data) = self
            .db
            .get_cf(&cf, key.as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
        else {
            return Ok(None);
        };

        let blob: CachedBlob = match ciborium::from_reader(data.as_slice()) {
            Ok(blob) => blob,
            Err(e) => {
                // Unreadable entries have no usable expiry; drop them so the
                // next write-back replaces them.
                tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                self.db
                    .delete_cf(&cf, key.as_bytes())
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                return Ok(None);
            }
        };

        if blob.expires_at <= Utc::now() {
            self.db
                .delete_cf(&cf, key.as_bytes())
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            return Ok(None);
        }

        Ok(Some(blob.value))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let blob = CachedBlob {
            expires_at: Utc::now() + ttl,
            value: value.to_vec(),
        };

        let mut buf = Vec::new();
        ciborium::into_writer(&blob, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let cf = self.cf()?;
        self.db
            .put_cf(&cf, key.as_bytes(), buf)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (RocksCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = RocksCache::open(dir.path()).unwrap();
        (cache, dir)
    }

    #[tokio::test]
    async fn stores_and_reads_back() {
        let (cache, _dir) = open_temp();
        cache
            .set("ringtones:slug:kesariya", b"payload", Duration::from_secs(60))
            .await
            .unwrap();

        let value = cache.get("ringtones:slug:kesariya").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn missing_key_is_absent() {
        let (cache, _dir) = open_temp();
        assert!(cache.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_absent_and_removed() {
        let (cache, _dir) = open_temp();
        cache.set("k", b"v", Duration::ZERO).await.unwrap();

        assert!(cache.get("k").await.unwrap().is_none());
        let cf = cache.cf().unwrap();
        assert!(cache.db.get_cf(&cf, b"k").unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_entry_is_dropped_and_replaceable() {
        let (cache, _dir) = open_temp();
        {
            let cf = cache.cf().unwrap();
            cache.db.put_cf(&cf, b"k", b"\xff\xfe not cbor").unwrap();
        }

        assert!(cache.get("k").await.unwrap().is_none());
        {
            let cf = cache.cf().unwrap();
            assert!(cache.db.get_cf(&cf, b"k").unwrap().is_none());
        }

        cache.set("k", b"fresh", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some(&b"fresh"[..]));
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = RocksCache::open(dir.path()).unwrap();
            cache.set("k", b"v", Duration::from_secs(60)).await.unwrap();
        }
        let cache = RocksCache::open(dir.path()).unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some(&b"v"[..]));
    }
}
