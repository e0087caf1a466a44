//! Explicit pipeline configuration.
//!
//! Everything the analysis stages need to decide (label sets, acceptance
//! thresholds, retry and timeout budgets for generation) lives here and is
//! handed to the orchestrator at construction. Values load from JSON; missing
//! keys take the defaults below.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::sentiment::{CandidateLabel, Intent, Sentiment};

// ═══════════════════════════════════════════════════════════
// Defaults
// ═══════════════════════════════════════════════════════════

/// Minimum aggregated score for a sentiment or intent label to be reported.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.35;

/// Aggregated scores closer than this are treated as tied.
pub const DEFAULT_TIE_EPSILON: f32 = 1e-6;

/// Retries after the first generation attempt.
pub const DEFAULT_GENERATION_RETRIES: u32 = 2;

/// Upper bound on configured retries.
pub const MAX_GENERATION_RETRIES: u32 = 10;

pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_MAX_TOKENS: u32 = 512;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("{0} label set must contain at least two labels")]
    TooFewLabels(&'static str),

    #[error("{set} label set lists '{label}' more than once")]
    DuplicateLabel { set: &'static str, label: String },

    #[error("Invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Cannot read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Cannot parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Configuration for one orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Candidate sentiment labels, in tie-break order.
    pub sentiment_labels: Vec<Sentiment>,
    /// Candidate intent labels, in tie-break order.
    pub intent_labels: Vec<Intent>,
    pub sentiment_threshold: f32,
    pub intent_threshold: f32,
    /// Reported when no sentiment clears the threshold.
    pub sentiment_fallback: Sentiment,
    /// Reported when no intent clears the threshold.
    pub intent_fallback: Intent,
    pub tie_epsilon: f32,
    /// Retries after a malformed or failed generation; attempts = retries + 1.
    pub generation_retries: u32,
    pub generation_timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Run extraction and classification concurrently.
    pub parallel_stages: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sentiment_labels: vec![
                Sentiment::Anxious,
                Sentiment::Neutral,
                Sentiment::Reassured,
                Sentiment::Concerned,
            ],
            intent_labels: vec![
                Intent::ReportingSymptoms,
                Intent::SeekingReassurance,
                Intent::ExpressingConcern,
                Intent::ExpressingRelief,
            ],
            sentiment_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            intent_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            sentiment_fallback: Sentiment::Neutral,
            intent_fallback: Intent::Unclear,
            tie_epsilon: DEFAULT_TIE_EPSILON,
            generation_retries: DEFAULT_GENERATION_RETRIES,
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            parallel_stages: true,
        }
    }
}

impl PipelineConfig {
    /// Load overrides from a JSON file and validate the result.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_labels("Sentiment", &self.sentiment_labels)?;
        check_labels("Intent", &self.intent_labels)?;
        check_threshold("sentiment_threshold", self.sentiment_threshold)?;
        check_threshold("intent_threshold", self.intent_threshold)?;

        if !self.tie_epsilon.is_finite() || self.tie_epsilon < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "tie_epsilon",
                reason: format!("must be a non-negative number, got {}", self.tie_epsilon),
            });
        }
        if self.generation_retries > MAX_GENERATION_RETRIES {
            return Err(ConfigError::InvalidValue {
                name: "generation_retries",
                reason: format!("at most {MAX_GENERATION_RETRIES}, got {}", self.generation_retries),
            });
        }
        if self.generation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "generation_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_tokens",
                reason: "must be greater than zero".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                name: "temperature",
                reason: format!("must be within [0, 2], got {}", self.temperature),
            });
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Total generation attempts, including the first.
    pub fn generation_attempts(&self) -> u32 {
        self.generation_retries + 1
    }
}

fn check_labels<T: CandidateLabel>(set: &'static str, labels: &[T]) -> Result<(), ConfigError> {
    if labels.len() < 2 {
        return Err(ConfigError::TooFewLabels(set));
    }
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(ConfigError::DuplicateLabel {
                set,
                label: label.as_str().to_string(),
            });
        }
    }
    Ok(())
}

fn check_threshold(name: &'static str, value: f32) -> Result<(), ConfigError> {
    // NaN fails the range check too.
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
