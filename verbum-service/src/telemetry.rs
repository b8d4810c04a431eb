//! Tracing subscriber setup
//!
//! Library crates only emit `tracing` events. The binary installs the
//! subscriber once at startup; logs go to stderr so stdout stays clean for
//! scripture output.

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use verbum_core::{ConfigError, VerbumError, VerbumResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "verbum=info,verbum_service=info,verbum_storage=info,verbum_fetch=info,verbum_usfm=warn";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(ConfigError::InvalidValue {
                field: "VERBUM_LOG_FORMAT".to_string(),
                value: other.to_string(),
                reason: "expected 'json' or 'pretty'".to_string(),
            }),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub format: LogFormat,
    /// Directive used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Raise the default filter to debug for every VERBUM crate.
    pub fn verbose(mut self) -> Self {
        self.default_filter =
            "verbum=debug,verbum_service=debug,verbum_storage=debug,verbum_fetch=debug,verbum_usfm=debug"
                .to_string();
        self
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup. A second call fails because a global subscriber is
/// already set.
pub fn init_tracing(config: &TelemetryConfig) -> VerbumResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let (json, pretty) = match config.format {
        LogFormat::Json => (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|e| VerbumError::internal(format!("Failed to init subscriber: {}", e)))?;

    tracing::debug!(format = ?config.format, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_verbose_filter() {
        let config = TelemetryConfig::default().verbose();
        assert!(config.default_filter.contains("verbum_storage=debug"));
    }

    #[test]
    fn test_init_twice_fails() {
        let config = TelemetryConfig::default().with_format(LogFormat::Json);
        // Another test in this binary may have installed one already.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
