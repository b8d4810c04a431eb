//! VERBUM Storage - Fetch Coalescing and Cache Stores
//!
//! Makes the expensive fetch and parse of a resource happen at most once
//! per key per TTL window, however many callers ask concurrently.

pub mod cache;
pub mod coalescer;

pub use cache::{
    CacheEntry, CacheKey, CacheRead, CacheStats, CacheStore, InMemoryCacheStore,
    InMemoryStoreConfig, LmdbCacheError, LmdbCacheStore, ReadSource,
};
pub use coalescer::{Coalescer, CoalescerConfig, CoalescerStats};
