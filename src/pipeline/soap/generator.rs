use std::time::Instant;

use crate::pipeline::entities::ClinicalSummary;
use crate::pipeline::transcript::Transcript;
use crate::pipeline_config::PipelineConfig;
use crate::providers::{GenerationRequest, ModelError, TextGenerator};

use super::grounding::ungrounded_terms;
use super::parser::parse_soap_response;
use super::prompt::{build_soap_prompt, repair_instruction, SOAP_SYSTEM_PROMPT};
use super::types::{GenerationError, GenerationReport, SoapNote};

/// Generates a SOAP note grounded in the transcript and its extracted facts.
///
/// Every response is parsed into the four sections. A malformed response is
/// retried with a repair instruction naming what was wrong; a transient model
/// failure (including a call that overran the timeout) is retried with the
/// original prompt. Either the note is complete or the call fails.
pub struct SoapNoteGenerator<'a> {
    model: &'a dyn TextGenerator,
    config: &'a PipelineConfig,
}

impl<'a> SoapNoteGenerator<'a> {
    pub fn new(model: &'a dyn TextGenerator, config: &'a PipelineConfig) -> Self {
        Self { model, config }
    }

    pub fn generate(
        &self,
        transcript: &Transcript,
        summary: &ClinicalSummary,
    ) -> Result<(SoapNote, GenerationReport), GenerationError> {
        let base = build_soap_prompt(transcript, summary);
        if base.neutralized_phrases > 0 {
            tracing::warn!(
                count = base.neutralized_phrases,
                "Neutralized instruction-like phrases in transcript"
            );
        }

        let attempts = self.config.generation_attempts();
        let timeout = self.config.generation_timeout();
        let mut prompt = base.text.clone();
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=attempts {
            let request = GenerationRequest {
                prompt: &prompt,
                system: SOAP_SYSTEM_PROMPT,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                timeout,
            };

            let started = Instant::now();
            let response = self.model.generate(&request).and_then(|text| {
                // Providers enforce the timeout themselves; this catches ones that don't.
                if started.elapsed() > timeout {
                    Err(ModelError::Timeout(timeout))
                } else {
                    Ok(text)
                }
            });

            let raw = match response {
                Ok(raw) => raw,
                Err(e) if e.is_retryable() => {
                    tracing::warn!(attempt, error = %e, "SOAP generation call failed, retrying");
                    last_failure = e.to_string();
                    prompt = base.text.clone();
                    continue;
                }
                Err(e) => return Err(GenerationError::Model(e)),
            };

            match parse_soap_response(&raw) {
                Ok(note) => {
                    let ungrounded = ungrounded_terms(&note, transcript);
                    if !ungrounded.is_empty() {
                        tracing::warn!(
                            terms = ?ungrounded,
                            "SOAP note mentions treatments not found in transcript"
                        );
                    }
                    tracing::debug!(attempt, model = self.model.model_name(), "SOAP note generated");
                    let report = GenerationReport {
                        model: self.model.model_name().to_string(),
                        attempts: attempt,
                        ungrounded_terms: ungrounded,
                        neutralized_phrases: base.neutralized_phrases,
                    };
                    return Ok((note, report));
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "SOAP response malformed, retrying with repair instruction");
                    prompt = format!("{}\n\n{}", base.text, repair_instruction(&e));
                    last_failure = e.to_string();
                }
            }
        }

        Err(GenerationError::Exhausted {
            attempts,
            last_failure,
        })
    }
}
