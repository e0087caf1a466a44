//! Model provider boundary.
//!
//! The pipeline talks to two opaque collaborators: a zero-shot text
//! classifier and a generative text model. Both are injected as trait
//! objects so the core can run against local services, hosted APIs, or the
//! deterministic mocks in [`mock`].

pub mod mock;
pub mod ollama;
pub mod zero_shot;

pub use mock::{MockTextGenerator, MockZeroShotClassifier};
pub use ollama::OllamaClient;
pub use zero_shot::HuggingFaceZeroShot;

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// Score per candidate label, as returned by a zero-shot model.
pub type LabelScores = HashMap<String, f32>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model provider is not reachable at {0}")]
    Connection(String),

    #[error("Model call timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Model provider returned error (status {status}): {body}")]
    HttpStatus { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed provider response: {0}")]
    ResponseParsing(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

impl ModelError {
    /// Transient failures that a fresh call may get past.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Connection(_) | ModelError::Timeout(_) | ModelError::Unavailable(_) => true,
            ModelError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ModelError::HttpClient(_) | ModelError::ResponseParsing(_) => false,
        }
    }
}

/// Zero-shot text classification: `classify(text, candidate_labels) -> label→score`.
pub trait ZeroShotClassifier {
    fn classify(&self, text: &str, candidate_labels: &[&str]) -> Result<LabelScores, ModelError>;

    /// Score several texts against the same labels. Providers that can batch
    /// override this; the result must equal calling `classify` per text.
    fn classify_batch(
        &self,
        texts: &[&str],
        candidate_labels: &[&str],
    ) -> Result<Vec<LabelScores>, ModelError> {
        texts
            .iter()
            .map(|text| self.classify(text, candidate_labels))
            .collect()
    }
}

/// One call to a generative model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub system: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound for this call; providers report overruns as [`ModelError::Timeout`].
    pub timeout: Duration,
}

/// Generative text model: `generate(prompt, max_tokens, temperature) -> text`.
pub trait TextGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ModelError>;

    /// Identifier reported alongside generated output.
    fn model_name(&self) -> &str;
}
