//! Single-flight fetch coalescer.
//!
//! Sits between callers and a [`CacheStore`]. A fresh entry is served
//! straight from the store. On a miss, exactly one caller per key (the
//! leader) runs the underlying fetch or compute while every concurrent
//! caller for the same key awaits the same shared result.
//!
//! ```text
//! get_or_fetch(key)
//!   ├─ store hit ──────────────────────────────► CacheRead { Cache }
//!   └─ miss ─► in-flight registry (DashMap)
//!               ├─ occupied ─► await shared ───► CacheRead { Coalesced }
//!               └─ vacant ──► spawn leader task
//!                              re-check store ─► fetch ─► store.set
//!                              remove registry entry ─► CacheRead { Leader }
//! ```
//!
//! The leader's work runs on its own task, so a caller that gives up early
//! never cancels the fetch for the callers still waiting on it. Failures are
//! shared with every waiter but never cached.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use verbum_core::{CacheStoreError, FetchError, VerbumError, VerbumResult};

use crate::cache::{CacheEntry, CacheKey, CacheRead, CacheStats, CacheStore, ReadSource};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for [`Coalescer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescerConfig {
    /// TTL used when a call does not name one.
    pub default_ttl: Duration,
    /// Upper bound on one underlying fetch. Computes are not bounded.
    pub fetch_timeout: Duration,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl CoalescerConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Snapshot of coalescer activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Reads served by a fresh store entry.
    pub hits: u64,
    /// Reads that found no fresh entry.
    pub misses: u64,
    /// Underlying fetch or compute runs.
    pub leader_runs: u64,
    /// Callers that attached to another caller's flight.
    pub coalesced: u64,
    /// Leader runs that ended in an error.
    pub failures: u64,
    /// Store get/set failures that were absorbed.
    pub store_errors: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    leader_runs: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
    store_errors: AtomicU64,
}

impl StatCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CoalescerStats {
        CoalescerStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            leader_runs: self.leader_runs.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// IN-FLIGHT REGISTRY
// ============================================================================

type FlightResult = Result<CacheEntry, VerbumError>;
type Flight = Shared<BoxFuture<'static, FlightResult>>;
type Registry = DashMap<CacheKey, Flight>;

/// Removes a key from the registry when the leader task finishes,
/// including when it panics or is aborted.
struct FlightGuard {
    registry: Arc<Registry>,
    key: CacheKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.key);
    }
}

// ============================================================================
// COALESCER
// ============================================================================

/// Cache handle with single-flight deduplication.
///
/// Cheap to clone; clones share the store, the registry and the counters.
#[derive(Clone)]
pub struct Coalescer {
    store: Arc<dyn CacheStore>,
    in_flight: Arc<Registry>,
    stats: Arc<StatCounters>,
    config: CoalescerConfig,
}

impl std::fmt::Debug for Coalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("in_flight", &self.in_flight.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Coalescer {
    pub fn new(store: Arc<dyn CacheStore>, config: CoalescerConfig) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
            stats: Arc::new(StatCounters::default()),
            config,
        }
    }

    pub fn config(&self) -> &CoalescerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn stats(&self) -> CoalescerStats {
        self.stats.snapshot()
    }

    pub async fn store_stats(&self) -> Result<CacheStats, CacheStoreError> {
        self.store.stats().await
    }

    /// Number of keys with a leader currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Return fresh bytes for `key`, running `fetcher` at most once across
    /// all concurrent callers on a miss.
    ///
    /// The fetch is bounded by the configured fetch timeout.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        fetcher: F,
    ) -> VerbumResult<CacheRead<Bytes>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes, FetchError>> + Send + 'static,
    {
        if let Some(entry) = self.lookup(key).await {
            return Ok(CacheRead::from_cache(entry.payload().clone(), entry.fetched_at_instant()));
        }

        let timeout = self.config.fetch_timeout;
        let resource = key.to_string();
        let start_fetch = move || {
            let fetch = fetcher();
            async move {
                match tokio::time::timeout(timeout, fetch).await {
                    Ok(Ok(bytes)) => Ok(bytes),
                    Ok(Err(e)) => Err(VerbumError::Fetch(e)),
                    Err(_) => Err(VerbumError::Fetch(FetchError::Timeout {
                        resource,
                        elapsed: timeout,
                    })),
                }
            }
            .boxed()
        };

        let (entry, source) = self.join_flight(key, ttl, start_fetch).await?;
        Ok(CacheRead::new(entry.payload().clone(), entry.fetched_at_instant(), source))
    }

    /// Return a fresh computed value for `key`, running `compute` at most
    /// once across all concurrent callers on a miss.
    ///
    /// Values are stored as JSON. A stored value that no longer decodes is
    /// dropped and recomputed.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        compute: F,
    ) -> VerbumResult<CacheRead<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = VerbumResult<T>> + Send + 'static,
    {
        if let Some(entry) = self.lookup(key).await {
            match serde_json::from_slice::<T>(entry.payload()) {
                Ok(value) => return Ok(CacheRead::from_cache(value, entry.fetched_at_instant())),
                Err(e) => {
                    StatCounters::bump(&self.stats.store_errors);
                    tracing::warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                    if let Err(e) = self.store.delete(key).await {
                        tracing::warn!(key = %key, error = %e, "Cache delete failed");
                    }
                }
            }
        }

        let start_compute = move || {
            let computing = compute();
            async move {
                let value = computing.await?;
                let encoded = serde_json::to_vec(&value).map_err(|e| {
                    VerbumError::Cache(CacheStoreError::Serialization {
                        reason: e.to_string(),
                    })
                })?;
                Ok(Bytes::from(encoded))
            }
            .boxed()
        };

        let (entry, source) = self.join_flight(key, ttl, start_compute).await?;
        let value = serde_json::from_slice::<T>(entry.payload()).map_err(|e| {
            VerbumError::Cache(CacheStoreError::Deserialization {
                reason: e.to_string(),
            })
        })?;
        Ok(CacheRead::new(value, entry.fetched_at_instant(), source))
    }

    /// Drop the stored entry for `key`. In-flight work is unaffected.
    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool, CacheStoreError> {
        self.store.delete(key).await
    }

    /// Flush the underlying store.
    pub async fn flush(&self) -> Result<(), CacheStoreError> {
        self.store.flush().await
    }

    /// Fresh entry from the store. Store failures count as misses.
    async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        match read_fresh(self.store.as_ref(), key, &self.stats).await {
            Some(entry) => {
                StatCounters::bump(&self.stats.hits);
                tracing::debug!(key = %key, "Cache hit");
                Some(entry)
            }
            None => {
                StatCounters::bump(&self.stats.misses);
                tracing::debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    /// Attach to the in-flight leader for `key`, or become it.
    ///
    /// `start_work` is called only by the leader, while the registry shard
    /// for `key` is locked. It must not touch this coalescer synchronously.
    async fn join_flight<W>(
        &self,
        key: &CacheKey,
        ttl: Option<Duration>,
        start_work: W,
    ) -> VerbumResult<(CacheEntry, ReadSource)>
    where
        W: FnOnce() -> BoxFuture<'static, Result<Bytes, VerbumError>>,
    {
        let ttl = ttl.unwrap_or(self.config.default_ttl);

        // The shard lock held by `entry` makes election atomic per key.
        let (flight, source) = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                StatCounters::bump(&self.stats.coalesced);
                tracing::debug!(key = %key, "Attached to in-flight fetch");
                (occupied.get().clone(), ReadSource::Coalesced)
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(key = %key, "Elected fetch leader");
                let flight = self.spawn_leader(key.clone(), ttl, start_work());
                vacant.insert(flight.clone());
                (flight, ReadSource::Leader)
            }
        };

        flight.await.map(|entry| (entry, source))
    }

    fn spawn_leader(
        &self,
        key: CacheKey,
        ttl: Duration,
        work: BoxFuture<'static, Result<Bytes, VerbumError>>,
    ) -> Flight {
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let guard = FlightGuard {
            registry: Arc::clone(&self.in_flight),
            key: key.clone(),
        };
        let resource = key.to_string();

        let task = tokio::spawn(async move {
            let _guard = guard;

            // A previous leader may have stored the value after our lookup.
            if let Some(entry) = read_fresh(store.as_ref(), &key, &stats).await {
                return Ok(entry);
            }

            StatCounters::bump(&stats.leader_runs);
            let started = Instant::now();
            match work.await {
                Ok(payload) => {
                    let entry = CacheEntry::new(payload, ttl);
                    if let Err(e) = store.set(&key, entry.clone()).await {
                        StatCounters::bump(&stats.store_errors);
                        tracing::warn!(key = %key, error = %e, "Cache set failed; serving uncached result");
                    }
                    tracing::debug!(
                        key = %key,
                        bytes = entry.payload().len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Leader fetch completed"
                    );
                    Ok(entry)
                }
                Err(e) => {
                    StatCounters::bump(&stats.failures);
                    tracing::warn!(
                        key = %key,
                        error = %e,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Leader fetch failed"
                    );
                    Err(e)
                }
            }
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => Err(VerbumError::Fetch(FetchError::Aborted {
                    resource,
                    reason: join_error.to_string(),
                })),
            }
        }
        .boxed()
        .shared()
    }
}

async fn read_fresh(
    store: &dyn CacheStore,
    key: &CacheKey,
    stats: &StatCounters,
) -> Option<CacheEntry> {
    match store.get(key).await {
        Ok(Some(entry)) if entry.is_fresh() => Some(entry),
        Ok(_) => None,
        Err(e) => {
            StatCounters::bump(&stats.store_errors);
            tracing::warn!(key = %key, error = %e, "Cache get failed; treating as miss");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use verbum_core::ResourceKey;

    fn john() -> CacheKey {
        CacheKey::raw(&ResourceKey::new("unfoldingWord", "en", "ult", "JHN", "master"))
    }

    fn coalescer() -> Coalescer {
        Coalescer::new(
            Arc::new(InMemoryCacheStore::default()),
            CoalescerConfig::default(),
        )
    }

    /// Fetcher that counts calls and sleeps before answering.
    fn slow_fetch(
        calls: &Arc<AtomicUsize>,
        delay: Duration,
        body: &'static [u8],
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Bytes, FetchError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(Bytes::from_static(body))
            }
            .boxed()
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheStoreError> {
            Err(CacheStoreError::Backend {
                reason: "down".to_string(),
            })
        }

        async fn set(&self, _key: &CacheKey, _entry: CacheEntry) -> Result<(), CacheStoreError> {
            Err(CacheStoreError::Backend {
                reason: "down".to_string(),
            })
        }

        async fn delete(&self, _key: &CacheKey) -> Result<bool, CacheStoreError> {
            Ok(false)
        }

        async fn stats(&self) -> Result<CacheStats, CacheStoreError> {
            Ok(CacheStats::default())
        }

        async fn flush(&self) -> Result<(), CacheStoreError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let coalescer = coalescer.clone();
            let fetch = slow_fetch(&calls, Duration::from_millis(100), b"\\c 3");
            handles.push(tokio::spawn(async move {
                coalescer.get_or_fetch(&john(), None, fetch).await
            }));
        }

        let mut leaders = 0;
        for handle in handles {
            let read = handle.await.unwrap().unwrap();
            assert_eq!(read.value().as_ref(), b"\\c 3");
            if read.source() == ReadSource::Leader {
                leaders += 1;
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(leaders, 1);
        let stats = coalescer.stats();
        assert_eq!(stats.leader_runs, 1);
        assert_eq!(stats.coalesced, 15);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_never_call_fetcher() {
        let coalescer = coalescer();
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = coalescer.clone();
            let invocations = Arc::clone(&invocations);
            handles.push(tokio::spawn(async move {
                coalescer
                    .get_or_fetch(&john(), None, move || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(Bytes::from_static(b"\\c 3"))
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.stats().leader_runs, 1);
        assert_eq!(coalescer.stats().coalesced, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_never_call_compute() {
        let coalescer = coalescer();
        let key = CacheKey::derived(john().resource(), "scripture:3:16:vn");
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = coalescer.clone();
            let key = key.clone();
            let invocations = Arc::clone(&invocations);
            handles.push(tokio::spawn(async move {
                coalescer
                    .get_or_compute(&key, None, move || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(16u32)
                        }
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap().value(), 16);
        }

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_leader_under_thread_race() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(tokio::sync::Barrier::new(32));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let coalescer = coalescer.clone();
            let barrier = Arc::clone(&barrier);
            let fetch = slow_fetch(&calls, Duration::from_millis(50), b"ok");
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                coalescer.get_or_fetch(&john(), None, fetch).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Some(Duration::from_secs(60));

        let first = coalescer
            .get_or_fetch(&john(), ttl, slow_fetch(&calls, Duration::ZERO, b"v1"))
            .await
            .unwrap();
        assert_eq!(first.source(), ReadSource::Leader);

        tokio::time::advance(Duration::from_secs(59)).await;
        let cached = coalescer
            .get_or_fetch(&john(), ttl, slow_fetch(&calls, Duration::ZERO, b"v2"))
            .await
            .unwrap();
        assert!(cached.was_cache_hit());
        assert_eq!(cached.value().as_ref(), b"v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        let refreshed = coalescer
            .get_or_fetch(&john(), ttl, slow_fetch(&calls, Duration::ZERO, b"v2"))
            .await
            .unwrap();
        assert_eq!(refreshed.source(), ReadSource::Leader);
        assert_eq!(refreshed.value().as_ref(), b"v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_shared_and_not_cached() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coalescer = coalescer.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                coalescer
                    .get_or_fetch(&john(), None, move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Err(FetchError::Network {
                            resource: "JHN".to_string(),
                            reason: "connection reset".to_string(),
                        })
                    })
                    .await
            }));
        }
        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(err.is_fetch_error());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.stats().failures, 1);

        // The next caller leads a fresh attempt.
        let read = coalescer
            .get_or_fetch(&john(), None, slow_fetch(&calls, Duration::ZERO, b"ok"))
            .await
            .unwrap();
        assert_eq!(read.source(), ReadSource::Leader);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let coalescer = Coalescer::new(
            Arc::new(InMemoryCacheStore::default()),
            CoalescerConfig::default().with_fetch_timeout(Duration::from_secs(1)),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let err = coalescer
            .get_or_fetch(&john(), None, slow_fetch(&calls, Duration::from_secs(5), b"late"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerbumError::Fetch(FetchError::Timeout { .. })));
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_leader_keeps_running() {
        let coalescer = coalescer();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let coalescer = coalescer.clone();
            let fetch = slow_fetch(&calls, Duration::from_millis(100), b"shared");
            tokio::spawn(async move { coalescer.get_or_fetch(&john(), None, fetch).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(coalescer.in_flight(), 1);

        let second = {
            let coalescer = coalescer.clone();
            let fetch = slow_fetch(&calls, Duration::from_millis(100), b"other");
            tokio::spawn(async move { coalescer.get_or_fetch(&john(), None, fetch).await })
        };
        tokio::task::yield_now().await;
        first.abort();

        let read = second.await.unwrap().unwrap();
        assert_eq!(read.value().as_ref(), b"shared");
        assert_eq!(read.source(), ReadSource::Coalesced);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_errors_degrade_to_fetch() {
        let coalescer = Coalescer::new(Arc::new(BrokenStore), CoalescerConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let read = coalescer
                .get_or_fetch(&john(), None, slow_fetch(&calls, Duration::ZERO, b"ok"))
                .await
                .unwrap();
            assert_eq!(read.value().as_ref(), b"ok");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // get before election, get on leader re-check, set after fetch
        assert_eq!(coalescer.stats().store_errors, 6);
    }

    #[tokio::test]
    async fn test_compute_round_trips_through_store() {
        let coalescer = coalescer();
        let key = CacheKey::derived(john().resource(), "scripture:3:16:vn");
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let read = coalescer
                .get_or_compute(&key, None, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["For".to_string(), "God".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(read.value(), &vec!["For".to_string(), "God".to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.stats().hits, 2);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_recomputed() {
        let coalescer = coalescer();
        let key = CacheKey::derived(john().resource(), "scripture:3:16:vn");
        coalescer
            .store()
            .set(&key, CacheEntry::new(Bytes::from_static(b"not json"), Duration::from_secs(60)))
            .await
            .unwrap();

        let read = coalescer
            .get_or_compute(&key, None, || async { Ok(7u32) })
            .await
            .unwrap();
        assert_eq!(*read.value(), 7);
        assert_eq!(read.source(), ReadSource::Leader);
    }

    #[tokio::test]
    async fn test_compute_error_propagates() {
        let coalescer = coalescer();
        let key = CacheKey::derived(john().resource(), "alignment");
        let result: VerbumResult<CacheRead<u32>> = coalescer
            .get_or_compute(&key, None, || async {
                Err(VerbumError::Fetch(FetchError::NotFound {
                    resource: "JHN".to_string(),
                }))
            })
            .await;
        assert!(result.unwrap_err().is_fetch_error());
        assert_eq!(coalescer.store_stats().await.unwrap().entry_count, 0);
    }
}
