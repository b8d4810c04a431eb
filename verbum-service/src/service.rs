//! Scripture service
//!
//! Composes the resource fetcher, the coalescing cache and the USFM parser.
//! Parsed results are cached per range and options, and the raw document
//! they come from is cached once per resource.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use verbum_core::{
    Citation, ReferenceError, ResourceKey, ScriptureFormat, ScriptureRequest, ScriptureResult,
    VerbumError, VerbumResult,
};
use verbum_fetch::{Door43Client, Door43Config, ResourceFetcher};
use verbum_storage::{
    CacheKey, CacheRead, CacheStore, Coalescer, CoalescerConfig, CoalescerStats,
    InMemoryCacheStore, InMemoryStoreConfig, LmdbCacheStore,
};
use verbum_usfm::{parse_document, ParseOptions, ParsedDocument};

use crate::config::{CacheBackendKind, ServiceConfig};

/// Outcome for one resource of a multi-resource request.
#[derive(Debug, Clone)]
pub struct ResourceOutcome {
    pub resource: String,
    pub result: VerbumResult<ScriptureResult>,
}

/// Entry point for scripture lookups.
///
/// Holds an explicit cache handle; build one per process (or per test) and
/// call [`ScriptureService::shutdown`] before exit.
#[derive(Clone)]
pub struct ScriptureService {
    fetcher: Arc<dyn ResourceFetcher>,
    coalescer: Coalescer,
    config: ServiceConfig,
}

impl std::fmt::Debug for ScriptureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptureService")
            .field("fetcher", &self.fetcher.name())
            .field("coalescer", &self.coalescer)
            .finish()
    }
}

impl ScriptureService {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        store: Arc<dyn CacheStore>,
        config: ServiceConfig,
    ) -> Self {
        let coalescer = Coalescer::new(
            store,
            CoalescerConfig::default()
                .with_ttl(config.raw_ttl)
                .with_fetch_timeout(config.fetch_deadline()),
        );
        Self {
            fetcher,
            coalescer,
            config,
        }
    }

    /// Build the Door43 client and the configured cache store.
    pub fn from_config(config: ServiceConfig) -> VerbumResult<Self> {
        config.validate()?;

        let client = Door43Client::new(
            Door43Config::default()
                .with_base_url(config.base_url.clone())
                .with_request_timeout(config.fetch_timeout)
                .with_retry(config.retry.clone()),
        )?;

        let store: Arc<dyn CacheStore> = match config.cache_backend {
            CacheBackendKind::Memory => Arc::new(InMemoryCacheStore::new(
                InMemoryStoreConfig::default().with_max_entries(config.cache_max_entries),
            )),
            CacheBackendKind::Lmdb => {
                Arc::new(LmdbCacheStore::open(&config.cache_path, config.cache_size_mb)?)
            }
        };

        tracing::info!(
            base_url = %config.base_url,
            backend = ?config.cache_backend,
            raw_ttl_secs = config.raw_ttl.as_secs(),
            parsed_ttl_secs = config.parsed_ttl.as_secs(),
            fetch_deadline_ms = config.fetch_deadline().as_millis() as u64,
            "Scripture service configured"
        );
        Ok(Self::new(Arc::new(client), store, config))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn coalescer(&self) -> &Coalescer {
        &self.coalescer
    }

    pub fn cache_stats(&self) -> CoalescerStats {
        self.coalescer.stats()
    }

    /// Fetch, parse and render the verses named by `request.reference`.
    ///
    /// Only fetch failures and invalid references are errors. Markup
    /// problems come back as warnings on the result.
    pub async fn fetch_scripture(&self, request: ScriptureRequest) -> VerbumResult<ScriptureResult> {
        let citation = Citation::parse(&request.reference)?;
        let book = citation.book().ok_or_else(|| ReferenceError::UnknownBook {
            book: citation.book.clone(),
        })?;
        let key = ResourceKey::for_book(
            request.organization.as_str(),
            request.language.as_str(),
            request.resource.as_str(),
            book,
        )
        .with_version(request.version.as_str());

        let parsed = self
            .parsed(&key, &citation, request.include_verse_numbers)
            .await?;
        tracing::debug!(
            reference = %citation,
            resource = %key,
            source = parsed.source().as_str(),
            "Scripture resolved"
        );
        let parsed = parsed.into_value();

        Ok(ScriptureResult {
            text: parsed.text,
            translation: key.translation(),
            citation,
            usfm: match request.format {
                ScriptureFormat::Usfm => Some(parsed.usfm),
                ScriptureFormat::Text => None,
            },
            alignment: request.include_alignment.then_some(parsed.alignment),
            warnings: parsed.warnings,
        })
    }

    /// Fetch the same reference from several resources concurrently.
    ///
    /// Each resource succeeds or fails on its own.
    pub async fn fetch_scripture_multi(
        &self,
        request: ScriptureRequest,
        resources: &[String],
    ) -> Vec<ResourceOutcome> {
        let lookups = resources.iter().map(|resource| {
            let request = request.clone().with_resource(resource.as_str());
            async move {
                ResourceOutcome {
                    resource: resource.clone(),
                    result: self.fetch_scripture(request).await,
                }
            }
        });
        join_all(lookups).await
    }

    /// Flush the cache store. Call before process exit.
    pub async fn shutdown(&self) -> VerbumResult<()> {
        self.coalescer.flush().await?;
        tracing::info!(stats = ?self.coalescer.stats(), "Scripture service shut down");
        Ok(())
    }

    async fn parsed(
        &self,
        key: &ResourceKey,
        citation: &Citation,
        include_verse_numbers: bool,
    ) -> VerbumResult<CacheRead<ParsedDocument>> {
        let derivative = format!(
            "scripture:{}:{}",
            citation.range_key(),
            if include_verse_numbers { "vn" } else { "plain" }
        );
        let parsed_key = CacheKey::derived(key, derivative);
        let raw_key = CacheKey::raw(key);

        let coalescer = self.coalescer.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let resource = key.clone();
        let options = ParseOptions::default()
            .with_range(citation.clone())
            .with_verse_numbers(include_verse_numbers)
            .with_weights(self.config.weights);
        let raw_ttl = self.config.raw_ttl;

        self.coalescer
            .get_or_compute(&parsed_key, Some(self.config.parsed_ttl), move || async move {
                let raw = coalescer
                    .get_or_fetch(&raw_key, Some(raw_ttl), move || async move {
                        fetcher.fetch(&resource).await
                    })
                    .await?
                    .into_value();
                parse_on_blocking_thread(raw, options).await
            })
            .await
    }
}

async fn parse_on_blocking_thread(
    raw: Bytes,
    options: ParseOptions,
) -> VerbumResult<ParsedDocument> {
    tokio::task::spawn_blocking(move || parse_document(&raw, &options))
        .await
        .map_err(|e| VerbumError::internal(format!("Parse task failed: {}", e)))
}
