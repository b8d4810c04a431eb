//! Configuration types

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Penalties applied by the alignment confidence heuristic.
///
/// Each entry starts at `1.0` and loses the matching weight for every
/// missing linguistic attribute, then is clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceWeights {
    /// Penalty when `strong` is absent.
    pub missing_strong: f64,
    /// Penalty when `lemma` is absent.
    pub missing_lemma: f64,
    /// Penalty when the source word is empty.
    pub missing_source: f64,
    /// Penalty when `occurrence` or `occurrences` is absent.
    pub missing_occurrence: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            missing_strong: 0.3,
            missing_lemma: 0.2,
            missing_source: 0.2,
            missing_occurrence: 0.1,
        }
    }
}

impl ConfidenceWeights {
    /// Reject weights that would make scoring non-monotonic or NaN.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("missing_strong", self.missing_strong),
            ("missing_lemma", self.missing_lemma),
            ("missing_source", self.missing_source),
            ("missing_occurrence", self.missing_occurrence),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                    reason: "must be a finite, non-negative number".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Retry configuration for resource store requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff to wait before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.max(1.0).powi(attempt as i32 - 1);
        let millis = self.initial_backoff.as_millis() as f64 * factor as f64;
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Longest a retried request can take when every attempt runs for
    /// `per_attempt`: all attempts plus every backoff between them.
    pub fn total_budget(&self, per_attempt: Duration) -> Duration {
        let attempts = per_attempt.saturating_mul(self.max_retries.saturating_add(1));
        (1..=self.max_retries)
            .map(|attempt| self.backoff_for(attempt))
            .fold(attempts, Duration::saturating_add)
    }
}
