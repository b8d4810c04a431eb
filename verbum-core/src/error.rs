//! Error types for VERBUM operations

use std::time::Duration;
use thiserror::Error;

/// Resource store client errors.
///
/// This is the only error family that surfaces to external callers as a
/// hard failure. Everything else degrades into a (possibly partial) result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Request for {resource} failed with status {status}: {message}")]
    Http {
        resource: String,
        status: u16,
        message: String,
    },

    #[error("Network error fetching {resource}: {reason}")]
    Network { resource: String, reason: String },

    #[error("Fetching {resource} timed out after {elapsed:?}")]
    Timeout { resource: String, elapsed: Duration },

    #[error("Invalid body for {resource}: {reason}")]
    InvalidBody { resource: String, reason: String },

    #[error("Fetch task for {resource} aborted: {reason}")]
    Aborted { resource: String, reason: String },
}

impl FetchError {
    /// Whether a retry has a realistic chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
            FetchError::Http { status, .. } => *status >= 500 || *status == 429,
            FetchError::NotFound { .. }
            | FetchError::InvalidBody { .. }
            | FetchError::Aborted { .. } => false,
        }
    }

    /// The resource the failed request was for.
    pub fn resource(&self) -> &str {
        match self {
            FetchError::NotFound { resource }
            | FetchError::Http { resource, .. }
            | FetchError::Network { resource, .. }
            | FetchError::Timeout { resource, .. }
            | FetchError::InvalidBody { resource, .. }
            | FetchError::Aborted { resource, .. } => resource,
        }
    }
}

/// Cache store errors. Never fatal to a request: a failed get is a miss and
/// a failed set is logged and dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheStoreError {
    #[error("Cache backend failure: {reason}")]
    Backend { reason: String },

    #[error("Cache serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Cache deserialization failed: {reason}")]
    Deserialization { reason: String },

    #[error("Corrupt cache entry under {key}")]
    Corrupt { key: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Scripture reference parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Reference is empty")]
    Empty,

    #[error("Unknown book: {book}")]
    UnknownBook { book: String },

    #[error("Invalid chapter in {reference}")]
    InvalidChapter { reference: String },

    #[error("Invalid verse in {reference}")]
    InvalidVerse { reference: String },

    #[error("Invalid range in {reference}: {reason}")]
    InvalidRange { reference: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all VERBUM errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerbumError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheStoreError),

    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

impl VerbumError {
    pub fn internal(reason: impl Into<String>) -> Self {
        VerbumError::Internal {
            reason: reason.into(),
        }
    }

    /// True for the "resource unavailable" class of failures.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, VerbumError::Fetch(_))
    }
}

/// Result type alias for VERBUM operations.
pub type VerbumResult<T> = Result<T, VerbumError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_not_found() {
        let err = FetchError::NotFound {
            resource: "unfoldingWord/en_ult/44-JHN.usfm".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Resource not found"));
        assert!(msg.contains("44-JHN.usfm"));
    }

    #[test]
    fn test_fetch_error_transience() {
        let server = FetchError::Http {
            resource: "r".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(server.is_transient());

        let client = FetchError::Http {
            resource: "r".to_string(),
            status: 400,
            message: "bad request".to_string(),
        };
        assert!(!client.is_transient());

        let missing = FetchError::NotFound {
            resource: "r".to_string(),
        };
        assert!(!missing.is_transient());

        let timeout = FetchError::Timeout {
            resource: "r".to_string(),
            elapsed: Duration::from_secs(30),
        };
        assert!(timeout.is_transient());
        assert_eq!(timeout.resource(), "r");
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "VERBUM_RAW_TTL_SECS".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("VERBUM_RAW_TTL_SECS"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_verbum_error_from_variants() {
        let fetch = VerbumError::from(FetchError::NotFound {
            resource: "x".to_string(),
        });
        assert!(matches!(fetch, VerbumError::Fetch(_)));
        assert!(fetch.is_fetch_error());

        let cache = VerbumError::from(CacheStoreError::LockPoisoned);
        assert!(matches!(cache, VerbumError::Cache(_)));
        assert!(!cache.is_fetch_error());

        let reference = VerbumError::from(ReferenceError::Empty);
        assert!(matches!(reference, VerbumError::Reference(_)));

        let config = VerbumError::from(ConfigError::MissingRequired {
            field: "base_url".to_string(),
        });
        assert!(matches!(config, VerbumError::Config(_)));
    }

    #[test]
    fn test_errors_are_cloneable_for_fan_out() {
        let err = VerbumError::from(FetchError::Network {
            resource: "x".to_string(),
            reason: "connection reset".to_string(),
        });
        let copies: Vec<VerbumError> = (0..3).map(|_| err.clone()).collect();
        assert!(copies.iter().all(|e| *e == err));
    }
}
