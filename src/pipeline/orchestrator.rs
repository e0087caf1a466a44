//! Pipeline orchestrator: raw transcript in, one structured record out.
//!
//! parse → (extract summary ∥ classify sentiment/intent) → generate SOAP note.
//!
//! Extraction and classification share only the parsed transcript, so with
//! `parallel_stages` the classifier runs on a scoped thread while extraction
//! and SOAP generation run on the caller's thread. Both orders produce the
//! same result.

use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::entities::{ClinicalEntityExtractor, ClinicalSummary};
use crate::pipeline::sentiment::{SentimentIntentClassifier, SentimentIntentResult};
use crate::pipeline::soap::{GenerationError, GenerationReport, SoapNote, SoapNoteGenerator};
use crate::pipeline::transcript::{Transcript, TranscriptError, TranscriptParser};
use crate::pipeline_config::{ConfigError, PipelineConfig};
use crate::providers::{TextGenerator, ZeroShotClassifier};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal pipeline failure, tagged with the stage that produced it.
///
/// Extraction and classification never fail: they degrade to empty fields
/// and fallback labels recorded in their results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Transcript parsing failed: {0}")]
    Parse(#[from] TranscriptError),

    #[error("SOAP generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "parse",
            PipelineError::Generation(_) => "soap_generation",
            PipelineError::Config(_) => "config",
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Everything one run produced. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub transcript: Transcript,
    pub summary: ClinicalSummary,
    pub sentiment: SentimentIntentResult,
    pub soap_note: SoapNote,
    pub generation: GenerationReport,
}

impl PipelineResult {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs the three analyses over one parsed transcript.
///
/// Model handles are injected already initialized; the orchestrator never
/// loads, caches or reconfigures them.
pub struct PipelineOrchestrator {
    classifier: Box<dyn ZeroShotClassifier + Send + Sync>,
    generator: Box<dyn TextGenerator + Send + Sync>,
    config: PipelineConfig,
    parser: TranscriptParser,
    extractor: ClinicalEntityExtractor,
}

impl PipelineOrchestrator {
    pub fn new(
        classifier: Box<dyn ZeroShotClassifier + Send + Sync>,
        generator: Box<dyn TextGenerator + Send + Sync>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            classifier,
            generator,
            config,
            parser: TranscriptParser::new(),
            extractor: ClinicalEntityExtractor::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Full run. Fails fast on the first fatal stage; partial results are
    /// discarded.
    pub fn run(&self, raw_transcript: &str) -> Result<PipelineResult, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", run_id = %run_id);
        let _guard = span.enter();

        let transcript = self.parser.parse(raw_transcript).map_err(|e| {
            tracing::warn!(stage = "parse", error = %e, "Pipeline aborted");
            PipelineError::from(e)
        })?;
        tracing::info!(
            utterances = transcript.utterances.len(),
            annotations = transcript.annotations.len(),
            "Transcript parsed"
        );

        let (summary, sentiment, generated) = if self.config.parallel_stages {
            self.run_parallel(&transcript)
        } else {
            self.run_sequential(&transcript)
        };

        let (soap_note, generation) = generated.map_err(|e| {
            tracing::warn!(stage = "soap_generation", error = %e, "Pipeline aborted");
            PipelineError::from(e)
        })?;

        tracing::info!(
            symptoms = summary.symptoms.len(),
            treatments = summary.treatments.len(),
            sentiment = %sentiment.sentiment,
            intent = %sentiment.intent,
            attempts = generation.attempts,
            "Pipeline run complete"
        );

        Ok(PipelineResult {
            run_id,
            generated_at: Utc::now(),
            transcript,
            summary,
            sentiment,
            soap_note,
            generation,
        })
    }

    fn run_sequential(&self, transcript: &Transcript) -> StageOutputs {
        let summary = self.extract(transcript);
        let sentiment = self.classify(transcript);
        let generated = self.generate(transcript, &summary);
        (summary, sentiment, generated)
    }

    fn run_parallel(&self, transcript: &Transcript) -> StageOutputs {
        let span = tracing::Span::current();
        thread::scope(|scope| {
            let classification = scope.spawn(|| span.in_scope(|| self.classify(transcript)));

            let summary = self.extract(transcript);
            let generated = self.generate(transcript, &summary);

            let sentiment = classification
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            (summary, sentiment, generated)
        })
    }

    fn extract(&self, transcript: &Transcript) -> ClinicalSummary {
        let summary = self.extractor.extract(&transcript.utterances);
        for warning in &summary.warnings {
            tracing::debug!(?warning, "Extraction warning");
        }
        summary
    }

    fn classify(&self, transcript: &Transcript) -> SentimentIntentResult {
        let patient = transcript.patient_utterances();
        let result = SentimentIntentClassifier::new(self.classifier.as_ref(), &self.config)
            .classify(&patient);
        for fallback in &result.fallbacks {
            tracing::info!(?fallback, "Classification fell back");
        }
        result
    }

    fn generate(
        &self,
        transcript: &Transcript,
        summary: &ClinicalSummary,
    ) -> Result<(SoapNote, GenerationReport), GenerationError> {
        SoapNoteGenerator::new(self.generator.as_ref(), &self.config).generate(transcript, summary)
    }
}

type StageOutputs = (
    ClinicalSummary,
    SentimentIntentResult,
    Result<(SoapNote, GenerationReport), GenerationError>,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::{JONES_TRANSCRIPT, KNEE_TRANSCRIPT};
    use crate::pipeline::sentiment::{Intent, Sentiment};
    use crate::pipeline::soap::SoapSection;
    use crate::providers::{MockTextGenerator, MockZeroShotClassifier, ModelError};

    const KNEE_NOTE: &str = "SUBJECTIVE: Patient reports sharp knee pain for two weeks and is worried.\n\
OBJECTIVE: No examination documented.\n\
ASSESSMENT: Knee pain, cause not yet determined.\n\
PLAN: Start ibuprofen.";

    fn classifier() -> Box<MockZeroShotClassifier> {
        Box::new(
            MockZeroShotClassifier::keywords()
                .with_rule("Anxious", &["worry", "worried", "worrying", "scared"])
                .with_rule("Reassured", &["relief", "great to hear"])
                .with_rule("Reporting symptoms", &["pain", "hurts", "ache"]),
        )
    }

    fn orchestrator(generator: MockTextGenerator, config: PipelineConfig) -> PipelineOrchestrator {
        PipelineOrchestrator::new(classifier(), Box::new(generator), config).unwrap()
    }

    #[test]
    fn knee_transcript_end_to_end() {
        let pipeline = orchestrator(MockTextGenerator::always(KNEE_NOTE), PipelineConfig::default());
        let result = pipeline.run(KNEE_TRANSCRIPT).unwrap();

        assert!(result.summary.symptoms.contains("knee pain"));
        assert!(result.summary.treatments.contains("ibuprofen"));
        assert_eq!(result.sentiment.sentiment, Sentiment::Anxious);
        assert_eq!(result.sentiment.intent, Intent::ReportingSymptoms);
        assert!(result.soap_note.subjective.contains("knee pain"));
        assert!(result.soap_note.plan.contains("ibuprofen"));
        assert_eq!(result.generation.attempts, 1);
        assert_eq!(result.transcript.utterances.len(), 3);
    }

    #[test]
    fn malformed_first_response_is_retried() {
        let generator = MockTextGenerator::new(&[
            "SUBJECTIVE: Knee pain.\nOBJECTIVE: None.\nASSESSMENT: Knee pain.",
            KNEE_NOTE,
        ]);
        let pipeline = orchestrator(generator, PipelineConfig::default());
        let result = pipeline.run(KNEE_TRANSCRIPT).unwrap();

        assert_eq!(result.generation.attempts, 2);
        assert!(SoapSection::ALL
            .iter()
            .all(|s| !result.soap_note.section(*s).is_empty()));
    }

    #[test]
    fn deterministic_stages_are_idempotent() {
        let pipeline = orchestrator(MockTextGenerator::always(KNEE_NOTE), PipelineConfig::default());
        let first = pipeline.run(JONES_TRANSCRIPT).unwrap();
        let second = pipeline.run(JONES_TRANSCRIPT).unwrap();

        assert_eq!(first.summary, second.summary);
        assert_eq!(first.sentiment, second.sentiment);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let parallel = orchestrator(MockTextGenerator::always(KNEE_NOTE), PipelineConfig::default());
        let sequential = orchestrator(
            MockTextGenerator::always(KNEE_NOTE),
            PipelineConfig {
                parallel_stages: false,
                ..Default::default()
            },
        );

        let a = parallel.run(JONES_TRANSCRIPT).unwrap();
        let b = sequential.run(JONES_TRANSCRIPT).unwrap();
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.sentiment, b.sentiment);
        assert_eq!(a.soap_note, b.soap_note);
    }

    #[test]
    fn parse_failure_aborts_before_models_are_called() {
        let generator = MockTextGenerator::always(KNEE_NOTE);
        let pipeline = orchestrator(generator, PipelineConfig::default());

        let err = pipeline.run("   \n  ").unwrap_err();
        assert_eq!(err, PipelineError::Parse(TranscriptError::EmptyInput));
        assert_eq!(err.stage(), "parse");

        let err = pipeline.run("just some notes without speakers").unwrap_err();
        assert_eq!(err, PipelineError::Parse(TranscriptError::NoUtterances));
    }

    #[test]
    fn generation_failure_aborts_run() {
        let pipeline = orchestrator(
            MockTextGenerator::always("I cannot write that note."),
            PipelineConfig::default(),
        );

        let err = pipeline.run(KNEE_TRANSCRIPT).unwrap_err();
        assert_eq!(err.stage(), "soap_generation");
        assert!(matches!(
            err,
            PipelineError::Generation(GenerationError::Exhausted { attempts: 3, .. })
        ));
    }

    #[test]
    fn classifier_outage_degrades_instead_of_failing() {
        let pipeline = PipelineOrchestrator::new(
            Box::new(MockZeroShotClassifier::failing(ModelError::Connection(
                "http://localhost:8080".into(),
            ))),
            Box::new(MockTextGenerator::always(KNEE_NOTE)),
            PipelineConfig::default(),
        )
        .unwrap();

        let result = pipeline.run(KNEE_TRANSCRIPT).unwrap();
        assert_eq!(result.sentiment.sentiment, Sentiment::Neutral);
        assert_eq!(result.sentiment.intent, Intent::Unclear);
        assert_eq!(result.sentiment.fallbacks.len(), 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PipelineConfig {
            sentiment_threshold: 1.5,
            ..Default::default()
        };
        let err = PipelineOrchestrator::new(
            classifier(),
            Box::new(MockTextGenerator::always(KNEE_NOTE)),
            config,
        )
        .err()
        .unwrap();
        assert_eq!(err.stage(), "config");
    }

    #[test]
    fn result_serializes_as_nested_document() {
        let pipeline = orchestrator(MockTextGenerator::always(KNEE_NOTE), PipelineConfig::default());
        let result = pipeline.run(KNEE_TRANSCRIPT).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["sentiment"]["sentiment"], "Anxious");
        assert_eq!(json["summary"]["treatments"], serde_json::json!(["ibuprofen"]));
        assert!(json["soap_note"]["plan"].as_str().unwrap().contains("ibuprofen"));
        assert_eq!(json["generation"]["model"], "mock-generator");
        assert!(json["run_id"].is_string());
    }
}
