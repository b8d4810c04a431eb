//! Cache store trait and statistics.
//!
//! The coalescer only needs get/set/delete-by-key with TTL semantics, so any
//! key-value backend (in-memory, disk, remote) can sit behind it.

use async_trait::async_trait;
use verbum_core::CacheStoreError;

use super::entry::CacheEntry;
use super::key::CacheKey;

/// Pluggable key-value store for cached payloads.
///
/// Implementations must be thread-safe. `get` never returns an expired
/// entry; stores may drop expired entries lazily on read.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a fresh entry, or `None` if absent or expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheStoreError>;

    /// Store an entry, replacing any previous entry under the key.
    async fn set(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheStoreError>;

    /// Remove an entry. Returns whether one existed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheStoreError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, CacheStoreError>;

    /// Make pending writes durable. A no-op for volatile stores.
    async fn flush(&self) -> Result<(), CacheStoreError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including expired entries.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate payload bytes held.
    pub memory_bytes: u64,
    /// Number of evictions due to capacity or expiry.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
