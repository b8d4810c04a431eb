//! Stored cache entries.

use bytes::Bytes;
use std::time::Duration;
use tokio::time::Instant;

/// One immutable cached payload.
///
/// Refreshing a key replaces its entry wholesale; entries are never patched.
/// `fetched_at` is monotonic so the paused test clock controls expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    payload: Bytes,
    fetched_at: Instant,
    ttl: Duration,
    hint: Option<String>,
}

impl CacheEntry {
    /// Entry fetched now.
    pub fn new(payload: Bytes, ttl: Duration) -> Self {
        Self::fetched_at(payload, Instant::now(), ttl)
    }

    pub fn fetched_at(payload: Bytes, fetched_at: Instant, ttl: Duration) -> Self {
        Self {
            payload,
            fetched_at,
            ttl,
            hint: None,
        }
    }

    /// Attach an etag or version hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn fetched_at_instant(&self) -> Instant {
        self.fetched_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }

    /// Fresh while strictly younger than its TTL.
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < self.ttl
    }

    /// Approximate retained size, used for store statistics.
    pub fn size_bytes(&self) -> usize {
        self.payload.len() + self.hint.as_ref().map_or(0, String::len)
    }
}
