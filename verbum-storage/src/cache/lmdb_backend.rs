//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep fetched documents and
//! parsed results across process restarts.
//!
//! # Record Format
//!
//! Each value is `[stored_at_ms: i64][ttl_ms: u64][hint_len: u32][hint][payload]`,
//! all integers little-endian. Monotonic instants do not survive a restart,
//! so freshness is rebuilt on read from the wall-clock age of `stored_at_ms`.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use heed::types::Bytes as RawBytes;
use heed::{Database, Env, EnvOpenOptions};
use tokio::time::Instant;
use verbum_core::{CacheStoreError, VerbumError};

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

const HEADER_LEN: usize = 8 + 8 + 4;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Record could not be decoded.
    #[error("Corrupt record under {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheStoreError {
    fn from(err: LmdbCacheError) -> Self {
        match err {
            LmdbCacheError::Corrupt(key) => CacheStoreError::Corrupt { key },
            other => CacheStoreError::Backend {
                reason: other.to_string(),
            },
        }
    }
}

impl From<LmdbCacheError> for VerbumError {
    fn from(err: LmdbCacheError) -> Self {
        VerbumError::Cache(err.into())
    }
}

/// Disk-backed cache store.
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<RawBytes, RawBytes>,
    stats: Arc<RwLock<CacheStats>>,
}

impl std::fmt::Debug for LmdbCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbCacheStore")
            .field("path", &self.env.path())
            .finish()
    }
}

impl LmdbCacheStore {
    /// Open (or create) a store under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<RawBytes, RawBytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    fn record_hit(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.hits += 1;
        }
    }

    fn record_miss(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.misses += 1;
        }
    }

    fn record_eviction(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.evictions += 1;
        }
    }

    fn remove(&self, key: &CacheKey) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        Ok(deleted)
    }
}

/// Serialize an entry stamped with the current wall-clock time.
fn encode_record(entry: &CacheEntry) -> Vec<u8> {
    // Carry over any age the entry already had.
    let age_ms = entry.age().as_millis() as i64;
    let stored_at_ms = Utc::now().timestamp_millis() - age_ms;
    let ttl_ms = entry.ttl().as_millis() as u64;
    let hint = entry.hint().unwrap_or_default().as_bytes();

    let mut record = Vec::with_capacity(HEADER_LEN + hint.len() + entry.payload().len());
    record.extend_from_slice(&stored_at_ms.to_le_bytes());
    record.extend_from_slice(&ttl_ms.to_le_bytes());
    record.extend_from_slice(&(hint.len() as u32).to_le_bytes());
    record.extend_from_slice(hint);
    record.extend_from_slice(entry.payload());
    record
}

/// Decode a record. `None` means the entry has expired.
fn decode_record(key: &CacheKey, record: &[u8]) -> Result<Option<CacheEntry>, LmdbCacheError> {
    let corrupt = || LmdbCacheError::Corrupt(key.to_string());
    if record.len() < HEADER_LEN {
        return Err(corrupt());
    }

    let stored_at_ms = i64::from_le_bytes(record[0..8].try_into().map_err(|_| corrupt())?);
    let ttl_ms = u64::from_le_bytes(record[8..16].try_into().map_err(|_| corrupt())?);
    let hint_len = u32::from_le_bytes(record[16..20].try_into().map_err(|_| corrupt())?) as usize;
    let body = &record[HEADER_LEN..];
    if body.len() < hint_len {
        return Err(corrupt());
    }
    let (hint, payload) = body.split_at(hint_len);
    let hint = std::str::from_utf8(hint).map_err(|_| corrupt())?;

    // Clock skew into the future counts as zero age.
    let age = Duration::from_millis(
        Utc::now().timestamp_millis().saturating_sub(stored_at_ms).max(0) as u64,
    );
    let ttl = Duration::from_millis(ttl_ms);
    if age >= ttl {
        return Ok(None);
    }
    let Some(fetched_at) = Instant::now().checked_sub(age) else {
        return Ok(None);
    };

    let mut entry = CacheEntry::fetched_at(Bytes::copy_from_slice(payload), fetched_at, ttl);
    if !hint.is_empty() {
        entry = entry.with_hint(hint);
    }
    Ok(Some(entry))
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheStoreError> {
        let decoded = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            match self.db.get(&rtxn, key.as_bytes()) {
                Ok(Some(record)) => Some(decode_record(key, record)),
                Ok(None) => None,
                Err(e) => {
                    self.record_miss();
                    return Err(LmdbCacheError::Transaction(e.to_string()).into());
                }
            }
        };

        match decoded {
            Some(Ok(Some(entry))) => {
                self.record_hit();
                Ok(Some(entry))
            }
            Some(Ok(None)) => {
                self.record_miss();
                self.remove(key)?;
                self.record_eviction();
                Ok(None)
            }
            Some(Err(e)) => {
                self.record_miss();
                // Unreadable records are dropped so the next leader can replace them.
                self.remove(key)?;
                Err(e.into())
            }
            None => {
                self.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheStoreError> {
        let record = encode_record(&entry);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key.as_bytes(), &record)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheStoreError> {
        Ok(self.remove(key)?)
    }

    async fn stats(&self) -> Result<CacheStats, CacheStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let entry_count = self
            .db
            .len(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let memory_bytes = self
            .env
            .real_disk_size()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        drop(rtxn);

        let stats = self
            .stats
            .read()
            .map_err(|_| CacheStoreError::LockPoisoned)?;
        Ok(CacheStats {
            entry_count,
            memory_bytes,
            ..stats.clone()
        })
    }

    async fn flush(&self) -> Result<(), CacheStoreError> {
        self.env
            .force_sync()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        tracing::debug!(path = %self.env.path().display(), "Flushed LMDB cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use verbum_core::ResourceKey;

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbCacheStore::open(temp_dir.path(), 10).expect("store should open");
        (store, temp_dir)
    }

    fn key() -> CacheKey {
        CacheKey::derived(
            &ResourceKey::new("unfoldingWord", "en", "ult", "JHN", "master"),
            "scripture:3:16:vn",
        )
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _dir) = create_test_store();
        let entry = CacheEntry::new(Bytes::from_static(b"{\"text\":\"16 For\"}"), Duration::from_secs(3600))
            .with_hint("v86");
        store.set(&key(), entry).await.unwrap();

        let found = store.get(&key()).await.unwrap().unwrap();
        assert_eq!(found.payload().as_ref(), b"{\"text\":\"16 For\"}");
        assert_eq!(found.hint(), Some("v86"));
        assert_eq!(found.ttl(), Duration::from_secs(3600));
        assert!(found.is_fresh());
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _dir) = create_test_store();
        assert!(store.get(&key()).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().misses, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = create_test_store();
        store
            .set(&key(), CacheEntry::new(Bytes::from_static(b"x"), Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(store.delete(&key()).await.unwrap());
        assert!(store.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_is_dropped() {
        let (store, _dir) = create_test_store();
        store
            .set(&key(), CacheEntry::new(Bytes::from_static(b"x"), Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.get(&key()).await.unwrap().is_none());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = LmdbCacheStore::open(temp_dir.path(), 10).unwrap();
            store
                .set(&key(), CacheEntry::new(Bytes::from_static(b"kept"), Duration::from_secs(60)))
                .await
                .unwrap();
            store.flush().await.unwrap();
        }
        let store = LmdbCacheStore::open(temp_dir.path(), 10).unwrap();
        let found = store.get(&key()).await.unwrap().unwrap();
        assert_eq!(found.payload().as_ref(), b"kept");
    }

    #[test]
    fn test_truncated_record_is_corrupt() {
        let err = decode_record(&key(), &[0u8; 5]).unwrap_err();
        assert!(matches!(err, LmdbCacheError::Corrupt(_)));

        let mut record = vec![0u8; HEADER_LEN];
        record[16..20].copy_from_slice(&10u32.to_le_bytes());
        assert!(decode_record(&key(), &record).is_err());
    }

    #[test]
    fn test_record_round_trip_keeps_age() {
        let entry = CacheEntry::new(Bytes::from_static(b"payload"), Duration::from_secs(60));
        let record = encode_record(&entry);
        let decoded = decode_record(&key(), &record).unwrap().unwrap();
        assert_eq!(decoded.payload(), entry.payload());
        assert!(decoded.age() < Duration::from_secs(5));
    }

    proptest::proptest! {
        #[test]
        fn prop_decode_never_panics(record in proptest::collection::vec(proptest::num::u8::ANY, 0..64)) {
            let _ = decode_record(&key(), &record);
        }
    }
}
