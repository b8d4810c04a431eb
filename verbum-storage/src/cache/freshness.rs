//! Provenance of coalesced reads.
//!
//! Every value returned by the coalescer says where it came from and how old
//! it is, so callers can report cache behavior without poking at the store.

use std::time::Duration;
use tokio::time::Instant;

/// Where a read was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadSource {
    /// A fresh entry was already in the store.
    Cache,
    /// This caller ran the underlying fetch or compute.
    Leader,
    /// This caller attached to another caller's in-flight work.
    Coalesced,
}

impl ReadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadSource::Cache => "cache",
            ReadSource::Leader => "leader",
            ReadSource::Coalesced => "coalesced",
        }
    }
}

/// Result of a coalesced read, carrying its origin and fetch time.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    fetched_at: Instant,
    source: ReadSource,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, fetched_at: Instant, source: ReadSource) -> Self {
        Self {
            value,
            fetched_at,
            source,
        }
    }

    /// A read served from a fresh store entry.
    pub fn from_cache(value: T, fetched_at: Instant) -> Self {
        Self::new(value, fetched_at, ReadSource::Cache)
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    /// When the underlying value was fetched or computed.
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// How long ago the value was fetched.
    pub fn staleness(&self) -> Duration {
        Instant::now().saturating_duration_since(self.fetched_at)
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            fetched_at: self.fetched_at,
            source: self.source,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_staleness_tracks_clock() {
        let read = CacheRead::from_cache(42u32, Instant::now());
        assert!(read.was_cache_hit());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(read.staleness(), Duration::from_secs(5));
    }

    #[test]
    fn test_map_keeps_provenance() {
        let read = CacheRead::new("16", Instant::now(), ReadSource::Coalesced);
        let mapped = read.map(|s| s.len());
        assert_eq!(*mapped.value(), 2);
        assert_eq!(mapped.source(), ReadSource::Coalesced);
        assert!(!mapped.was_cache_hit());
        assert_eq!(mapped.source().as_str(), "coalesced");
    }
}
