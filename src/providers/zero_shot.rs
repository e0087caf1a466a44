use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{LabelScores, ModelError, ZeroShotClassifier};

/// Zero-shot classification through the Hugging Face inference API
/// (`zero-shot-classification` task, e.g. `facebook/bart-large-mnli`).
///
/// Runs in single-label mode, so scores for one text sum to 1 across the
/// candidate labels. Batches are sent as one request with an `inputs` array.
pub struct HuggingFaceZeroShot {
    endpoint: String,
    token: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HuggingFaceZeroShot {
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ModelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ModelError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/models/{}", base_url.trim_end_matches('/'), model),
            token,
            client,
            timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a [&'a str],
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

#[derive(Debug, Deserialize)]
struct ZeroShotOutput {
    labels: Vec<String>,
    scores: Vec<f32>,
}

/// The API answers a one-element batch with a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Batch(Vec<ZeroShotOutput>),
    Single(ZeroShotOutput),
}

impl ZeroShotResponse {
    fn into_outputs(self) -> Vec<ZeroShotOutput> {
        match self {
            ZeroShotResponse::Batch(outputs) => outputs,
            ZeroShotResponse::Single(output) => vec![output],
        }
    }
}

fn output_to_scores(output: ZeroShotOutput) -> Result<LabelScores, ModelError> {
    if output.labels.len() != output.scores.len() {
        return Err(ModelError::ResponseParsing(format!(
            "{} labels but {} scores",
            output.labels.len(),
            output.scores.len()
        )));
    }
    Ok(output.labels.into_iter().zip(output.scores).collect())
}

fn parse_response(body: &str, expected: usize) -> Result<Vec<LabelScores>, ModelError> {
    let parsed: ZeroShotResponse =
        serde_json::from_str(body).map_err(|e| ModelError::ResponseParsing(e.to_string()))?;
    let outputs = parsed.into_outputs();
    if outputs.len() != expected {
        return Err(ModelError::ResponseParsing(format!(
            "expected {expected} results, got {}",
            outputs.len()
        )));
    }
    outputs.into_iter().map(output_to_scores).collect()
}

impl ZeroShotClassifier for HuggingFaceZeroShot {
    fn classify(&self, text: &str, candidate_labels: &[&str]) -> Result<LabelScores, ModelError> {
        let mut results = self.classify_batch(&[text], candidate_labels)?;
        results
            .pop()
            .ok_or_else(|| ModelError::ResponseParsing("empty result set".into()))
    }

    fn classify_batch(
        &self,
        texts: &[&str],
        candidate_labels: &[&str],
    ) -> Result<Vec<LabelScores>, ModelError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = ZeroShotRequest {
            inputs: texts,
            parameters: ZeroShotParameters {
                candidate_labels,
                multi_label: false,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(Duration::from_secs(self.timeout_secs))
            } else if e.is_connect() {
                ModelError::Connection(self.endpoint.clone())
            } else {
                ModelError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;
        if !status.is_success() {
            return Err(ModelError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text, texts.len())
    }
}
