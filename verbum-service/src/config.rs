//! Service Configuration Module
//!
//! Configuration is loaded from `VERBUM_*` environment variables with
//! defaults suitable for the public Door43 host.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use verbum_core::{ConfidenceWeights, ConfigError, RetryConfig};
use verbum_fetch::DEFAULT_BASE_URL;

use crate::telemetry::LogFormat;

/// Slack added on top of the retry budget for connection setup.
const FETCH_DEADLINE_GRACE: Duration = Duration::from_millis(500);

// ============================================================================
// CACHE BACKEND
// ============================================================================

/// Which cache store backs the coalescer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Lmdb,
}

impl FromStr for CacheBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "lmdb" => Ok(Self::Lmdb),
            other => Err(ConfigError::InvalidValue {
                field: "VERBUM_CACHE_BACKEND".to_string(),
                value: other.to_string(),
                reason: "expected 'memory' or 'lmdb'".to_string(),
            }),
        }
    }
}

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Configuration for [`crate::ScriptureService`] and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Content host base URL.
    pub base_url: String,

    pub default_language: String,
    pub default_organization: String,
    pub default_resource: String,

    /// TTL for raw document bytes.
    pub raw_ttl: Duration,
    /// TTL for parsed scripture results.
    pub parsed_ttl: Duration,
    /// Timeout for one request attempt. See [`ServiceConfig::fetch_deadline`]
    /// for the bound on a whole retried fetch.
    pub fetch_timeout: Duration,
    pub retry: RetryConfig,

    pub cache_backend: CacheBackendKind,
    /// Directory for the LMDB store.
    pub cache_path: PathBuf,
    /// Capacity of the in-memory store.
    pub cache_max_entries: usize,
    /// LMDB map size.
    pub cache_size_mb: usize,

    pub log_format: LogFormat,
    pub weights: ConfidenceWeights,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_language: "en".to_string(),
            default_organization: "unfoldingWord".to_string(),
            default_resource: "ult".to_string(),
            raw_ttl: Duration::from_secs(3600),
            parsed_ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_millis(30_000),
            retry: RetryConfig::default(),
            cache_backend: CacheBackendKind::Memory,
            cache_path: PathBuf::from(".verbum-cache"),
            cache_max_entries: 1024,
            cache_size_mb: 256,
            log_format: LogFormat::Pretty,
            weights: ConfidenceWeights::default(),
        }
    }
}

impl ServiceConfig {
    /// Create ServiceConfig from environment variables.
    ///
    /// Environment variables:
    /// - `VERBUM_BASE_URL`: Content host (default: https://git.door43.org)
    /// - `VERBUM_DEFAULT_LANGUAGE`: Language code (default: en)
    /// - `VERBUM_DEFAULT_ORGANIZATION`: Organization (default: unfoldingWord)
    /// - `VERBUM_DEFAULT_RESOURCE`: Resource id (default: ult)
    /// - `VERBUM_RAW_TTL_SECS`: Raw document TTL (default: 3600)
    /// - `VERBUM_PARSED_TTL_SECS`: Parsed result TTL (default: 3600)
    /// - `VERBUM_FETCH_TIMEOUT_MS`: Per-attempt fetch timeout (default: 30000)
    /// - `VERBUM_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `VERBUM_CACHE_PATH`: LMDB directory (default: .verbum-cache)
    /// - `VERBUM_CACHE_MAX_ENTRIES`: In-memory capacity (default: 1024)
    /// - `VERBUM_CACHE_SIZE_MB`: LMDB map size (default: 256)
    /// - `VERBUM_LOG_FORMAT`: "json" or "pretty" (default: pretty)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source, then validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |name: &str, default: String| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let config = Self {
            base_url: text("VERBUM_BASE_URL", defaults.base_url),
            default_language: text("VERBUM_DEFAULT_LANGUAGE", defaults.default_language),
            default_organization: text("VERBUM_DEFAULT_ORGANIZATION", defaults.default_organization),
            default_resource: text("VERBUM_DEFAULT_RESOURCE", defaults.default_resource),
            raw_ttl: Duration::from_secs(parse_var(&lookup, "VERBUM_RAW_TTL_SECS", 3600)?),
            parsed_ttl: Duration::from_secs(parse_var(&lookup, "VERBUM_PARSED_TTL_SECS", 3600)?),
            fetch_timeout: Duration::from_millis(parse_var(
                &lookup,
                "VERBUM_FETCH_TIMEOUT_MS",
                30_000,
            )?),
            retry: defaults.retry,
            cache_backend: parse_var(&lookup, "VERBUM_CACHE_BACKEND", CacheBackendKind::Memory)?,
            cache_path: lookup("VERBUM_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            cache_max_entries: parse_var(&lookup, "VERBUM_CACHE_MAX_ENTRIES", 1024)?,
            cache_size_mb: parse_var(&lookup, "VERBUM_CACHE_SIZE_MB", 256)?,
            log_format: parse_var(&lookup, "VERBUM_LOG_FORMAT", LogFormat::Pretty)?,
            weights: defaults.weights,
        };
        config.validate()?;
        Ok(config)
    }

    /// Upper bound on one fetch with every retry and backoff included.
    ///
    /// The grace period keeps the outer bound from firing while the last
    /// attempt is still inside its own timeout.
    pub fn fetch_deadline(&self) -> Duration {
        self.retry
            .total_budget(self.fetch_timeout)
            .saturating_add(FETCH_DEADLINE_GRACE)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, value: String, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        };

        if self.base_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "VERBUM_BASE_URL".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(invalid(
                "VERBUM_BASE_URL",
                self.base_url.clone(),
                "must be an http(s) URL",
            ));
        }
        if self.raw_ttl.is_zero() {
            return Err(invalid("VERBUM_RAW_TTL_SECS", "0".to_string(), "must be positive"));
        }
        if self.parsed_ttl.is_zero() {
            return Err(invalid("VERBUM_PARSED_TTL_SECS", "0".to_string(), "must be positive"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(invalid("VERBUM_FETCH_TIMEOUT_MS", "0".to_string(), "must be positive"));
        }
        if self.cache_max_entries == 0 {
            return Err(invalid("VERBUM_CACHE_MAX_ENTRIES", "0".to_string(), "must be positive"));
        }
        if self.cache_backend == CacheBackendKind::Lmdb && self.cache_size_mb == 0 {
            return Err(invalid("VERBUM_CACHE_SIZE_MB", "0".to_string(), "must be positive"));
        }
        self.weights.validate()
    }
}

fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                value: raw.clone(),
                reason: "could not be parsed".to_string(),
            })
        }
        _ => Ok(default),
    }
}
