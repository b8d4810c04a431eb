//! VERBUM Fetch - Resource Store Client
//!
//! Retrieves the raw USFM document for a [`ResourceKey`]. The coalescer
//! calls a [`ResourceFetcher`] only on a cache miss, and at most once per key
//! at a time.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use verbum_core::{FetchError, ResourceKey};

pub mod door43;
pub mod local;

pub use door43::{Door43Client, Door43Config, DEFAULT_BASE_URL};
pub use local::StaticFetcher;

// ============================================================================
// FETCHER TRAIT
// ============================================================================

/// Source of raw resource documents.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the document bytes for one resource key.
    ///
    /// # Returns
    /// * `Ok(Bytes)` - The raw, undecoded document
    /// * `Err(FetchError)` - Not found, HTTP failure, network failure or timeout
    async fn fetch(&self, key: &ResourceKey) -> Result<Bytes, FetchError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<F: ResourceFetcher + ?Sized> ResourceFetcher for Arc<F> {
    async fn fetch(&self, key: &ResourceKey) -> Result<Bytes, FetchError> {
        (**self).fetch(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
