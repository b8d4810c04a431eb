//! Cache stores and the types the coalescer moves through them.
//!
//! [`CacheStore`] is the swappable persistence seam. Two implementations
//! ship here: [`InMemoryCacheStore`] for a single process and
//! [`LmdbCacheStore`] for a cache that survives restarts.

pub mod entry;
pub mod freshness;
pub mod key;
pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use entry::CacheEntry;
pub use freshness::{CacheRead, ReadSource};
pub use key::CacheKey;
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::{InMemoryCacheStore, InMemoryStoreConfig};
pub use traits::{CacheStats, CacheStore};
