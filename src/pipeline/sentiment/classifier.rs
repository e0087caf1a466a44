use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::transcript::{Speaker, Utterance};
use crate::pipeline_config::PipelineConfig;
use crate::providers::{LabelScores, ZeroShotClassifier};

use super::types::{CandidateLabel, ClassificationFallback, Dimension, SentimentIntentResult};

/// Emotional cues used to pick the focus utterance.
static EMOTIONAL_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:worr(?:y|ied|ying|ies)|scared|afraid|frightened|nervous|anxious|concerned|relie(?:f|ved)|great|rough|upset)\b",
    )
    .expect("valid regex")
});

/// Outcome for one label set.
#[derive(Debug, Clone, PartialEq)]
struct Decision<T> {
    label: T,
    confidence: f32,
    fallback: Option<ClassificationFallback>,
}

/// Zero-shot sentiment and intent classification of the patient's turns.
///
/// Each patient utterance is scored against every candidate label, scores are
/// renormalized per utterance and averaged, and the best average wins. Near
/// ties go to the label that wins the most individual utterances, then to
/// candidate order. A winner that does not exceed the acceptance threshold
/// is replaced by the configured fallback label.
pub struct SentimentIntentClassifier<'a> {
    model: &'a dyn ZeroShotClassifier,
    config: &'a PipelineConfig,
}

impl<'a> SentimentIntentClassifier<'a> {
    pub fn new(model: &'a dyn ZeroShotClassifier, config: &'a PipelineConfig) -> Self {
        Self { model, config }
    }

    /// Classify the patient's side of a conversation. Non-patient utterances are ignored.
    pub fn classify(&self, utterances: &[&Utterance]) -> SentimentIntentResult {
        let patient: Vec<&Utterance> = utterances
            .iter()
            .copied()
            .filter(|u| u.speaker == Speaker::Patient)
            .collect();

        if patient.is_empty() {
            tracing::debug!("No patient utterances; using fallback labels");
            return SentimentIntentResult {
                sentiment: self.config.sentiment_fallback,
                intent: self.config.intent_fallback,
                sentiment_confidence: 0.0,
                intent_confidence: 0.0,
                analyzed_utterances: 0,
                focus_utterance: None,
                fallbacks: vec![ClassificationFallback::NoPatientUtterances],
            };
        }

        let texts: Vec<&str> = patient.iter().map(|u| u.text.as_str()).collect();

        let sentiment = self.decide(
            Dimension::Sentiment,
            &texts,
            &self.config.sentiment_labels,
            self.config.sentiment_threshold,
            self.config.sentiment_fallback,
        );
        let intent = self.decide(
            Dimension::Intent,
            &texts,
            &self.config.intent_labels,
            self.config.intent_threshold,
            self.config.intent_fallback,
        );

        tracing::debug!(
            utterances = texts.len(),
            sentiment = %sentiment.label.as_str(),
            sentiment_confidence = sentiment.confidence,
            intent = %intent.label.as_str(),
            intent_confidence = intent.confidence,
            "Classified patient sentiment and intent"
        );

        SentimentIntentResult {
            sentiment: sentiment.label,
            intent: intent.label,
            sentiment_confidence: sentiment.confidence,
            intent_confidence: intent.confidence,
            analyzed_utterances: texts.len(),
            focus_utterance: focus_utterance(&patient),
            fallbacks: sentiment.fallback.into_iter().chain(intent.fallback).collect(),
        }
    }

    fn decide<T: CandidateLabel>(
        &self,
        dimension: Dimension,
        texts: &[&str],
        candidates: &[T],
        threshold: f32,
        fallback: T,
    ) -> Decision<T> {
        let names: Vec<&str> = candidates.iter().map(|c| c.as_str()).collect();

        let scored = self
            .model
            .classify_batch(texts, &names)
            .map_err(|e| e.to_string())
            .and_then(|batch| {
                if batch.len() == texts.len() {
                    Ok(batch)
                } else {
                    Err(format!(
                        "expected {} score sets, got {}",
                        texts.len(),
                        batch.len()
                    ))
                }
            });

        let batch = match scored {
            Ok(batch) => batch,
            Err(error) => {
                tracing::warn!(dimension = %dimension, error = %error, "Zero-shot classification failed; using fallback label");
                return Decision {
                    label: fallback,
                    confidence: 0.0,
                    fallback: Some(ClassificationFallback::ModelUnavailable { dimension, error }),
                };
            }
        };

        let rows: Vec<Vec<f32>> = batch.iter().map(|scores| renormalize(scores, &names)).collect();
        let averages = average_columns(&rows, names.len());
        let wins = argmax_counts(&rows, names.len());
        let best = pick_winner(&averages, &wins, self.config.tie_epsilon);
        let confidence = averages[best];

        // Acceptance requires strictly exceeding the threshold.
        if confidence <= threshold {
            tracing::debug!(
                dimension = %dimension,
                best = names[best],
                score = confidence,
                threshold,
                "Best label does not exceed acceptance threshold"
            );
            return Decision {
                label: fallback,
                confidence,
                fallback: Some(ClassificationFallback::LowConfidence {
                    dimension,
                    best_label: names[best].to_string(),
                    score: confidence,
                    threshold,
                }),
            };
        }

        Decision {
            label: candidates[best],
            confidence,
            fallback: None,
        }
    }
}

/// Scores for `labels` in order, rescaled to sum to 1. Missing, negative or
/// non-finite scores count as 0; an all-zero row becomes uniform.
fn renormalize(scores: &LabelScores, labels: &[&str]) -> Vec<f32> {
    let raw: Vec<f32> = labels
        .iter()
        .map(|label| match scores.get(*label) {
            Some(s) if s.is_finite() && *s > 0.0 => *s,
            _ => 0.0,
        })
        .collect();
    let total: f32 = raw.iter().sum();
    if total > 0.0 {
        raw.iter().map(|s| s / total).collect()
    } else {
        vec![1.0 / labels.len() as f32; labels.len()]
    }
}

fn average_columns(rows: &[Vec<f32>], width: usize) -> Vec<f32> {
    let n = rows.len().max(1) as f32;
    (0..width)
        .map(|i| rows.iter().map(|row| row[i]).sum::<f32>() / n)
        .collect()
}

/// How many rows each column wins; a row's tie goes to the earlier column.
fn argmax_counts(rows: &[Vec<f32>], width: usize) -> Vec<usize> {
    let mut wins = vec![0; width];
    for row in rows {
        let mut best = 0;
        for (i, score) in row.iter().enumerate() {
            if *score > row[best] {
                best = i;
            }
        }
        if width > 0 {
            wins[best] += 1;
        }
    }
    wins
}

/// Index of the highest average; near ties go to more per-utterance wins,
/// then to the earlier candidate.
fn pick_winner(averages: &[f32], wins: &[usize], epsilon: f32) -> usize {
    let max = averages.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    (0..averages.len())
        .filter(|&i| max - averages[i] <= epsilon)
        .max_by(|&a, &b| wins[a].cmp(&wins[b]).then(b.cmp(&a)))
        .unwrap_or(0)
}

/// First patient utterance with an emotional cue, else the last one.
fn focus_utterance(patient: &[&Utterance]) -> Option<usize> {
    patient
        .iter()
        .find(|u| EMOTIONAL_CUE.is_match(&u.text))
        .or_else(|| patient.last())
        .map(|u| u.order_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sentiment::{Intent, Sentiment};
    use crate::pipeline::transcript::parse_transcript;
    use crate::providers::{MockZeroShotClassifier, ModelError};

    fn anxious_mock() -> MockZeroShotClassifier {
        MockZeroShotClassifier::keywords()
            .with_rule("Anxious", &["worry", "worried", "worrying", "scared"])
            .with_rule("Reassured", &["relief", "great to hear"])
            .with_rule("Reporting symptoms", &["pain", "hurts", "ache"])
            .with_rule("Seeking reassurance", &["will i", "do i need to"])
    }

    fn utterances(raw: &str) -> Vec<Utterance> {
        parse_transcript(raw).unwrap().utterances
    }

    #[test]
    fn worried_patient_is_anxious_and_reporting() {
        let model = anxious_mock();
        let config = PipelineConfig::default();
        let all = utterances(crate::pipeline::fixtures::KNEE_TRANSCRIPT);
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);

        assert_eq!(result.sentiment, Sentiment::Anxious);
        assert_eq!(result.intent, Intent::ReportingSymptoms);
        assert!(result.sentiment_confidence >= config.sentiment_threshold);
        assert!(result.sentiment_confidence <= 1.0);
        assert_eq!(result.analyzed_utterances, 1);
        assert_eq!(result.focus_utterance, Some(1));
        assert!(result.fallbacks.is_empty());
    }

    #[test]
    fn one_batch_call_per_label_set() {
        let model = anxious_mock();
        let config = PipelineConfig::default();
        let all = utterances(crate::pipeline::fixtures::JONES_TRANSCRIPT);
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);

        assert_eq!(model.batch_calls(), 2);
        assert_eq!(result.analyzed_utterances, 12);
    }

    #[test]
    fn low_confidence_falls_back() {
        // Uniform over four labels: 0.25 < 0.35
        let model = MockZeroShotClassifier::fixed(&[]);
        let config = PipelineConfig::default();
        let all = utterances("Patient: Hello there.");
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);

        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.intent, Intent::Unclear);
        assert!((result.sentiment_confidence - 0.25).abs() < 1e-6);
        assert!(matches!(
            &result.fallbacks[0],
            ClassificationFallback::LowConfidence { dimension: Dimension::Sentiment, best_label, .. }
                if best_label == "Anxious"
        ));
        assert_eq!(result.fallbacks.len(), 2);
    }

    #[test]
    fn score_equal_to_threshold_falls_back() {
        let model = MockZeroShotClassifier::fixed(&[("Anxious", 0.75), ("Reassured", 0.25)]);
        let config = PipelineConfig {
            sentiment_labels: vec![Sentiment::Anxious, Sentiment::Reassured],
            sentiment_threshold: 0.75,
            ..Default::default()
        };
        let all = utterances("Patient: I'm not sure.");
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.sentiment_confidence, 0.75);

        let lower = PipelineConfig {
            sentiment_threshold: 0.5,
            ..config
        };
        let result = SentimentIntentClassifier::new(&model, &lower).classify(&refs);
        assert_eq!(result.sentiment, Sentiment::Anxious);
    }

    #[test]
    fn near_tie_goes_to_majority_of_utterances() {
        let model = MockZeroShotClassifier::per_text(&[
            ("first", &[("Anxious", 0.9), ("Reassured", 0.1)]),
            ("second", &[("Anxious", 0.3), ("Reassured", 0.7)]),
            ("third", &[("Anxious", 0.3), ("Reassured", 0.7)]),
        ]);
        let config = PipelineConfig {
            sentiment_labels: vec![Sentiment::Anxious, Sentiment::Reassured],
            ..Default::default()
        };
        let all = utterances("Patient: first\nPatient: second\nPatient: third");
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);

        assert_eq!(result.sentiment, Sentiment::Reassured);
        assert!((result.sentiment_confidence - 0.5).abs() < 1e-5);
    }

    #[test]
    fn exact_tie_without_majority_goes_to_candidate_order() {
        let model = MockZeroShotClassifier::fixed(&[("Anxious", 0.5), ("Concerned", 0.5)]);
        let config = PipelineConfig {
            sentiment_labels: vec![Sentiment::Concerned, Sentiment::Anxious],
            ..Default::default()
        };
        let all = utterances("Patient: I'm not sure.");
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);
        assert_eq!(result.sentiment, Sentiment::Concerned);
    }

    #[test]
    fn no_patient_utterances_skips_model() {
        let model = anxious_mock();
        let config = PipelineConfig::default();
        let all = utterances("Doctor: Hello?\nNurse: Nobody here.");
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);

        assert_eq!(result.sentiment, config.sentiment_fallback);
        assert_eq!(result.intent, config.intent_fallback);
        assert_eq!(result.sentiment_confidence, 0.0);
        assert_eq!(result.fallbacks, vec![ClassificationFallback::NoPatientUtterances]);
        assert_eq!(model.batch_calls(), 0);
    }

    #[test]
    fn model_failure_degrades_to_fallback() {
        let model = MockZeroShotClassifier::failing(ModelError::Unavailable("loading".into()));
        let config = PipelineConfig::default();
        let all = utterances("Patient: My back hurts.");
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);

        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.intent, Intent::Unclear);
        assert_eq!(result.fallbacks.len(), 2);
        assert!(result.fallbacks.iter().all(|f| matches!(
            f,
            ClassificationFallback::ModelUnavailable { .. }
        )));
    }

    #[test]
    fn labels_always_from_candidates_or_fallback() {
        let model = MockZeroShotClassifier::per_text(&[("", &[("Furious", 0.99), ("Neutral", 0.01)])]);
        let config = PipelineConfig::default();
        let all = utterances("Patient: Whatever.");
        let refs: Vec<&Utterance> = all.iter().collect();

        let result = SentimentIntentClassifier::new(&model, &config).classify(&refs);

        assert!(config.sentiment_labels.contains(&result.sentiment)
            || result.sentiment == config.sentiment_fallback);
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert!((result.sentiment_confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn renormalize_handles_partial_and_invalid_scores() {
        let scores: LabelScores = [("a".to_string(), 2.0), ("b".to_string(), f32::NAN)]
            .into_iter()
            .collect();
        assert_eq!(renormalize(&scores, &["a", "b", "c"]), vec![1.0, 0.0, 0.0]);

        let empty = LabelScores::new();
        let uniform = renormalize(&empty, &["a", "b"]);
        assert_eq!(uniform, vec![0.5, 0.5]);
    }

    #[test]
    fn focus_prefers_first_emotional_utterance() {
        let all = utterances(crate::pipeline::fixtures::JONES_TRANSCRIPT);
        let patient: Vec<&Utterance> = all.iter().filter(|u| u.speaker == Speaker::Patient).collect();
        // "The first four weeks were rough."
        assert_eq!(focus_utterance(&patient), Some(11));

        let calm = utterances("Patient: Fine.\nDoctor: Good.\nPatient: Thanks.");
        let calm_patient: Vec<&Utterance> = calm.iter().filter(|u| u.speaker == Speaker::Patient).collect();
        assert_eq!(focus_utterance(&calm_patient), Some(2));
    }
}
