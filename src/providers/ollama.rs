use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{GenerationRequest, ModelError, TextGenerator};

/// Connection establishment is bounded separately from the per-request budget.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Ollama HTTP client for local SOAP generation.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Create a client for `model` on the Ollama instance at `base_url`.
    pub fn new(base_url: &str, model: &str) -> Result<Self, ModelError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ModelError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// Default Ollama instance at localhost:11434.
    pub fn default_local(model: &str) -> Result<Self, ModelError> {
        Self::new(crate::config::DEFAULT_OLLAMA_URL, model)
    }

    fn map_send_error(&self, e: reqwest::Error, timeout: Duration) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout(timeout)
        } else if e.is_connect() {
            ModelError::Connection(self.base_url.clone())
        } else {
            ModelError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl TextGenerator for OllamaClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ModelError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: request.prompt,
            system: request.system,
            stream: false,
            options: OllamaOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ModelError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(request.timeout)
            } else {
                ModelError::ResponseParsing(e.to_string())
            }
        })?;

        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
