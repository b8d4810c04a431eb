//! VERBUM Core - Data Types
//!
//! Pure data structures shared by every other crate: resource identity,
//! citations, the alignment model, errors and configuration.
//! This crate contains no I/O and no async code.

pub mod alignment;
pub mod config;
pub mod error;
pub mod reference;
pub mod resource;
pub mod scripture;
pub mod warning;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use alignment::{
    AlignmentAttributes, AlignmentEntry, AlignmentMetadata, AlignmentResult, AlignmentType,
    Position,
};
pub use config::{ConfidenceWeights, RetryConfig};
pub use error::{
    CacheStoreError, ConfigError, FetchError, ReferenceError, VerbumError, VerbumResult,
};
pub use reference::{Book, Citation, BOOKS};
pub use resource::{ResourceKey, DEFAULT_VERSION};
pub use scripture::{ScriptureFormat, ScriptureRequest, ScriptureResult};
pub use warning::{MarkupWarning, MarkupWarningKind, ParseWarnings};
