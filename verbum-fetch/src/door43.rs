//! Door43 content host client with retry and concurrency limiting

use crate::ResourceFetcher;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use verbum_core::{FetchError, ResourceKey, RetryConfig};

/// Public Door43 host.
pub const DEFAULT_BASE_URL: &str = "https://git.door43.org";

/// Longest error body kept in an `Http` error message.
const MAX_ERROR_BODY: usize = 200;

/// Configuration for [`Door43Client`].
#[derive(Debug, Clone, PartialEq)]
pub struct Door43Config {
    pub base_url: String,
    /// Per-request timeout, applied to each attempt.
    pub request_timeout: Duration,
    /// Maximum requests in flight against the host.
    pub max_concurrent: usize,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for Door43Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            max_concurrent: 8,
            retry: RetryConfig::default(),
            user_agent: concat!("verbum/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Door43Config {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }
}

/// Fetches book files from Door43 repositories.
///
/// `unfoldingWord/en_ult` at `master` resolves to
/// `{base}/unfoldingWord/en_ult/raw/branch/master/44-JHN.usfm`; a pinned
/// version resolves through `raw/tag/{version}`.
pub struct Door43Client {
    client: Client,
    config: Door43Config,
    limiter: Arc<Semaphore>,
}

impl Door43Client {
    pub fn new(config: Door43Config) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network {
                resource: config.base_url.clone(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            limiter: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
        })
    }

    pub fn config(&self) -> &Door43Config {
        &self.config
    }

    /// Raw file URL for a resource key.
    pub fn url_for(&self, key: &ResourceKey) -> String {
        let git_ref = if key.is_default_version() {
            "branch/master".to_string()
        } else {
            format!("tag/{}", key.version)
        };
        format!(
            "{}/{}/{}/raw/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            key.organization,
            key.repository(),
            git_ref,
            key.file_name()
        )
    }

    async fn fetch_once(&self, key: &ResourceKey, url: &str) -> Result<Bytes, FetchError> {
        let resource = key.to_string();
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| FetchError::Aborted {
                resource: resource.clone(),
                reason: format!("Request limiter closed: {}", e),
            })?;

        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&resource, e, started))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { resource });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                resource,
                status: status.as_u16(),
                message: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&resource, e, started))?;
        if body.is_empty() {
            return Err(FetchError::InvalidBody {
                resource,
                reason: "empty document".to_string(),
            });
        }

        tracing::debug!(
            resource = %resource,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched resource"
        );
        Ok(body)
    }
}

#[async_trait]
impl ResourceFetcher for Door43Client {
    async fn fetch(&self, key: &ResourceKey) -> Result<Bytes, FetchError> {
        let url = self.url_for(key);
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match self.fetch_once(key, &url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < retry.max_retries => {
                    attempt += 1;
                    let backoff = retry.backoff_for(attempt);
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Retrying resource fetch"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &str {
        "door43"
    }
}

impl std::fmt::Debug for Door43Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Door43Client")
            .field("base_url", &self.config.base_url)
            .field("max_concurrent", &self.config.max_concurrent)
            .finish()
    }
}

fn transport_error(resource: &str, err: reqwest::Error, started: Instant) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            resource: resource.to_string(),
            elapsed: started.elapsed(),
        }
    } else {
        FetchError::Network {
            resource: resource.to_string(),
            reason: err.to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{StatusCode as AxumStatus, Uri};
    use axum::Router;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const JOHN: &str = "\\id JHN\n\\c 3\n\\v 16 For God so loved the world\n";

    #[derive(Clone, Default)]
    struct Host {
        hits: Arc<AtomicUsize>,
        /// Respond 503 this many times before succeeding.
        fail_first: usize,
    }

    async fn serve_file(State(host): State<Host>, uri: Uri) -> (AxumStatus, String) {
        let n = host.hits.fetch_add(1, Ordering::SeqCst);
        match uri.path() {
            "/unfoldingWord/en_ult/raw/branch/master/44-JHN.usfm"
            | "/unfoldingWord/en_ult/raw/tag/v86/44-JHN.usfm" => {
                if n < host.fail_first {
                    (AxumStatus::SERVICE_UNAVAILABLE, "try later".to_string())
                } else {
                    (AxumStatus::OK, JOHN.to_string())
                }
            }
            "/unfoldingWord/en_ult/raw/branch/master/45-ACT.usfm" => {
                (AxumStatus::BAD_REQUEST, "bad".to_string())
            }
            "/unfoldingWord/en_ult/raw/branch/master/46-ROM.usfm" => {
                (AxumStatus::OK, String::new())
            }
            _ => (AxumStatus::NOT_FOUND, "Not found".to_string()),
        }
    }

    async fn spawn_host(host: Host) -> String {
        let app = Router::new().fallback(serve_file).with_state(host);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String) -> Door43Client {
        let retry = RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        };
        Door43Client::new(
            Door43Config::default()
                .with_base_url(base_url)
                .with_retry(retry)
                .with_request_timeout(Duration::from_secs(5)),
        )
        .unwrap()
    }

    fn key(book: &str) -> ResourceKey {
        ResourceKey::new("unfoldingWord", "en", "ult", book, "master")
    }

    #[test]
    fn test_url_for_branch_and_tag() {
        let client = client("https://git.door43.org/".to_string());
        assert_eq!(
            client.url_for(&key("JHN")),
            "https://git.door43.org/unfoldingWord/en_ult/raw/branch/master/44-JHN.usfm"
        );
        assert_eq!(
            client.url_for(&key("GEN").with_version("v86")),
            "https://git.door43.org/unfoldingWord/en_ult/raw/tag/v86/01-GEN.usfm"
        );
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let host = Host::default();
        let hits = Arc::clone(&host.hits);
        let client = client(spawn_host(host).await);

        let body = client.fetch(&key("JHN")).await.unwrap();
        assert_eq!(body.as_ref(), JOHN.as_bytes());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let pinned = client.fetch(&key("JHN").with_version("v86")).await.unwrap();
        assert_eq!(pinned, body);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let host = Host::default();
        let hits = Arc::clone(&host.hits);
        let client = client(spawn_host(host).await);

        let err = client.fetch(&key("LUK")).await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let host = Host {
            fail_first: 2,
            ..Default::default()
        };
        let hits = Arc::clone(&host.hits);
        let client = client(spawn_host(host).await);

        let body = client.fetch(&key("JHN")).await.unwrap();
        assert_eq!(body.as_ref(), JOHN.as_bytes());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let host = Host {
            fail_first: 10,
            ..Default::default()
        };
        let hits = Arc::clone(&host.hits);
        let client = client(spawn_host(host).await);

        let err = client.fetch(&key("JHN")).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_and_empty_body() {
        let client = client(spawn_host(Host::default()).await);

        let err = client.fetch(&key("ACT")).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 400, .. }));
        assert!(!err.is_transient());

        let err = client.fetch(&key("ROM")).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidBody { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Door43Client::new(
            Door43Config::default()
                .with_base_url(format!("http://{}", addr))
                .with_retry(RetryConfig::disabled()),
        )
        .unwrap();
        let err = client.fetch(&key("JHN")).await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("λόγοςλόγος", 5), "λόγος...");
    }
}
