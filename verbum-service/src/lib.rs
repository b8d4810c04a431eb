//! VERBUM Service - Scripture Lookup
//!
//! Wires the Door43 fetcher, the coalescing cache and the USFM parser into a
//! single [`ScriptureService`]. The `verbum` binary is a thin CLI over it.

pub mod config;
pub mod service;
pub mod telemetry;

pub use config::{CacheBackendKind, ServiceConfig};
pub use service::{ResourceOutcome, ScriptureService};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, DEFAULT_FILTER};
