//! In-process cache store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use verbum_core::CacheStoreError;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

/// Configuration for [`InMemoryCacheStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStoreConfig {
    /// Maximum number of entries. When full, the entry with the oldest
    /// `fetched_at` is evicted.
    pub max_entries: usize,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self { max_entries: 1024 }
    }
}

impl InMemoryStoreConfig {
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }
}

/// `RwLock<HashMap>` store with lazy TTL expiry and capacity eviction.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    stats: RwLock<CacheStats>,
    config: InMemoryStoreConfig,
}

impl InMemoryCacheStore {
    pub fn new(config: InMemoryStoreConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            config,
        }
    }

    pub fn config(&self) -> &InMemoryStoreConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheStoreError> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheStoreError::LockPoisoned)?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            self.record_evictions(removed as u64);
            tracing::debug!(removed, remaining = entries.len(), "Purged expired cache entries");
        }
        Ok(removed)
    }

    /// Purge expired entries every `period` until the store is dropped.
    ///
    /// Only touches stored entries; work in flight in a coalescer is
    /// unaffected.
    pub fn spawn_purge_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                if let Err(e) = store.purge_expired() {
                    tracing::warn!(error = %e, "Cache purge failed");
                }
            }
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

    fn record_evictions(&self, count: u64) {
        if let Ok(mut stats) = self.stats.write() {
            stats.evictions += count;
        }
    }

    fn evict_oldest(entries: &mut HashMap<CacheKey, CacheEntry>) -> bool {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.fetched_at_instant())
            .map(|(key, _)| key.clone());
        match oldest {
            Some(key) => entries.remove(&key).is_some(),
            None => false,
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheStoreError> {
        let found = {
            let entries = self
                .entries
                .read()
                .map_err(|_| CacheStoreError::LockPoisoned)?;
            entries.get(key).cloned()
        };

        match found {
            Some(entry) if entry.is_fresh() => {
                self.record_hit();
                Ok(Some(entry))
            }
            Some(_) => {
                let mut entries = self
                    .entries
                    .write()
                    .map_err(|_| CacheStoreError::LockPoisoned)?;
                // A concurrent set may have refreshed the key meanwhile.
                if entries.get(key).is_some_and(|e| !e.is_fresh()) {
                    entries.remove(key);
                    drop(entries);
                    self.record_evictions(1);
                }
                self.record_miss();
                Ok(None)
            }
            None => {
                self.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheStoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheStoreError::LockPoisoned)?;
        let mut evicted = 0;
        if !entries.contains_key(key) {
            while entries.len() >= self.config.max_entries && Self::evict_oldest(&mut entries) {
                evicted += 1;
            }
        }
        entries.insert(key.clone(), entry);
        drop(entries);

        if evicted > 0 {
            tracing::debug!(key = %key, evicted, "Evicted cache entries at capacity");
            self.record_evictions(evicted);
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheStoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| CacheStoreError::LockPoisoned)?;
        Ok(entries.remove(key).is_some())
    }

    async fn stats(&self) -> Result<CacheStats, CacheStoreError> {
        let (entry_count, memory_bytes) = {
            let entries = self
                .entries
                .read()
                .map_err(|_| CacheStoreError::LockPoisoned)?;
            let bytes: usize = entries.values().map(CacheEntry::size_bytes).sum();
            (entries.len() as u64, bytes as u64)
        };
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
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use verbum_core::ResourceKey;

    fn key(book: &str) -> CacheKey {
        CacheKey::raw(&ResourceKey::new("unfoldingWord", "en", "ult", book, "master"))
    }

    fn entry(payload: &'static [u8], ttl_secs: u64) -> CacheEntry {
        CacheEntry::new(Bytes::from_static(payload), Duration::from_secs(ttl_secs))
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryCacheStore::new(InMemoryStoreConfig::default());
        assert!(store.get(&key("JHN")).await.unwrap().is_none());

        store.set(&key("JHN"), entry(b"\\c 3", 60)).await.unwrap();
        let found = store.get(&key("JHN")).await.unwrap().unwrap();
        assert_eq!(found.payload().as_ref(), b"\\c 3");

        assert!(store.delete(&key("JHN")).await.unwrap());
        assert!(!store.delete(&key("JHN")).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_removed_on_read() {
        let store = InMemoryCacheStore::new(InMemoryStoreConfig::default());
        store.set(&key("JHN"), entry(b"x", 10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(store.get(&key("JHN")).await.unwrap().is_none());
        assert_eq!(store.len(), 0);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = InMemoryCacheStore::new(InMemoryStoreConfig::default().with_max_entries(2));
        let base = Instant::now();
        for (offset, book) in [(0u64, "GEN"), (1, "EXO")] {
            let e = CacheEntry::fetched_at(
                Bytes::from_static(b"x"),
                base + Duration::from_secs(offset),
                Duration::from_secs(600),
            );
            store.set(&key(book), e).await.unwrap();
        }
        store.set(&key("LEV"), entry(b"y", 600)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.get(&key("GEN")).await.unwrap().is_none());
        assert!(store.get(&key("EXO")).await.unwrap().is_some());
        assert!(store.get(&key("LEV")).await.unwrap().is_some());
        assert_eq!(store.stats().await.unwrap().evictions, 1);
    }

    #[tokio::test]
    async fn test_replacing_key_does_not_evict() {
        let store = InMemoryCacheStore::new(InMemoryStoreConfig::default().with_max_entries(1));
        store.set(&key("JHN"), entry(b"old", 60)).await.unwrap();
        store.set(&key("JHN"), entry(b"new", 60)).await.unwrap();

        let found = store.get(&key("JHN")).await.unwrap().unwrap();
        assert_eq!(found.payload().as_ref(), b"new");
        assert_eq!(store.stats().await.unwrap().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = InMemoryCacheStore::default();
        store.set(&key("GEN"), entry(b"a", 5)).await.unwrap();
        store.set(&key("EXO"), entry(b"b", 50)).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_purge() {
        let store = Arc::new(InMemoryCacheStore::default());
        store.set(&key("GEN"), entry(b"a", 5)).await.unwrap();
        let handle = store.spawn_purge_task(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(store.is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn test_stats_report_size() {
        let store = InMemoryCacheStore::default();
        store.set(&key("JHN"), entry(b"abcd", 60)).await.unwrap();
        store.get(&key("JHN")).await.unwrap();
        store.get(&key("ROM")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, 4);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
