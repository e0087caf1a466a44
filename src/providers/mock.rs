//! Deterministic stand-ins for the model providers.
//!
//! Used by the test suites and by callers who want to exercise the pipeline
//! without a model server.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{GenerationRequest, LabelScores, ModelError, TextGenerator, ZeroShotClassifier};

/// Mock generator that replays a queue of scripted responses.
///
/// Once the queue is drained it keeps returning the `repeat` response, or
/// `ModelError::Unavailable` if none was set. Every prompt is recorded.
pub struct MockTextGenerator {
    responses: Mutex<VecDeque<Result<String, ModelError>>>,
    repeat: Option<String>,
    prompts: Mutex<Vec<String>>,
    model: String,
}

impl MockTextGenerator {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| Ok(r.to_string())).collect()),
            repeat: None,
            prompts: Mutex::new(Vec::new()),
            model: "mock-generator".to_string(),
        }
    }

    /// Always answer with `response`.
    pub fn always(response: &str) -> Self {
        Self::new(&[]).repeating(response)
    }

    pub fn repeating(mut self, response: &str) -> Self {
        self.repeat = Some(response.to_string());
        self
    }

    /// Queue a failure ahead of any later scripted responses.
    pub fn then_error(self, error: ModelError) -> Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    pub fn then_respond(self, response: &str) -> Self {
        lock(&self.responses).push_back(Ok(response.to_string()));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

impl TextGenerator for MockTextGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ModelError> {
        lock(&self.prompts).push(request.prompt.to_string());

        match lock(&self.responses).pop_front() {
            Some(scripted) => scripted,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| ModelError::Unavailable("mock response queue exhausted".into())),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

enum ClassifierMode {
    /// Labels whose keywords occur in the text get more weight.
    Keywords(Vec<(String, Vec<String>)>),
    /// First entry whose key occurs in the text supplies the scores.
    PerText(Vec<(String, LabelScores)>),
    Failing(ModelError),
}

/// Mock zero-shot classifier with keyword, fixed, or failing behavior.
///
/// Scores are always restricted to the requested candidate labels and
/// normalized to sum to 1, mirroring single-label zero-shot output.
pub struct MockZeroShotClassifier {
    mode: ClassifierMode,
    batch_calls: AtomicUsize,
}

/// Weight added per keyword hit in keyword mode.
const KEYWORD_WEIGHT: f32 = 4.0;

impl MockZeroShotClassifier {
    /// Keyword-rule classifier with no rules (uniform scores until rules are added).
    pub fn keywords() -> Self {
        Self::with_mode(ClassifierMode::Keywords(Vec::new()))
    }

    pub fn with_rule(mut self, label: &str, keywords: &[&str]) -> Self {
        if let ClassifierMode::Keywords(rules) = &mut self.mode {
            rules.push((
                label.to_string(),
                keywords.iter().map(|k| k.to_lowercase()).collect(),
            ));
        }
        self
    }

    /// Same scores for every text.
    pub fn fixed(scores: &[(&str, f32)]) -> Self {
        Self::with_mode(ClassifierMode::PerText(vec![(String::new(), to_scores(scores))]))
    }

    /// Scores chosen by the first `key` contained in the text; other texts score uniformly.
    pub fn per_text(entries: &[(&str, &[(&str, f32)])]) -> Self {
        Self::with_mode(ClassifierMode::PerText(
            entries
                .iter()
                .map(|(key, scores)| (key.to_string(), to_scores(scores)))
                .collect(),
        ))
    }

    pub fn failing(error: ModelError) -> Self {
        Self::with_mode(ClassifierMode::Failing(error))
    }

    /// Number of `classify_batch` invocations (one per label set per run).
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn with_mode(mode: ClassifierMode) -> Self {
        Self {
            mode,
            batch_calls: AtomicUsize::new(0),
        }
    }

    fn raw_weights(&self, text: &str, labels: &[&str]) -> Result<Vec<f32>, ModelError> {
        let lower = text.to_lowercase();
        match &self.mode {
            ClassifierMode::Failing(e) => Err(e.clone()),
            ClassifierMode::Keywords(rules) => Ok(labels
                .iter()
                .map(|label| {
                    let hits: usize = rules
                        .iter()
                        .filter(|(l, _)| l == label)
                        .map(|(_, kws)| kws.iter().filter(|k| lower.contains(k.as_str())).count())
                        .sum();
                    1.0 + KEYWORD_WEIGHT * hits as f32
                })
                .collect()),
            ClassifierMode::PerText(entries) => {
                let matched = entries
                    .iter()
                    .find(|(key, _)| lower.contains(&key.to_lowercase()));
                Ok(labels
                    .iter()
                    .map(|label| match matched {
                        Some((_, scores)) => scores.get(*label).copied().unwrap_or(0.0),
                        None => 1.0,
                    })
                    .collect())
            }
        }
    }
}

impl ZeroShotClassifier for MockZeroShotClassifier {
    fn classify(&self, text: &str, candidate_labels: &[&str]) -> Result<LabelScores, ModelError> {
        let weights = self.raw_weights(text, candidate_labels)?;
        let total: f32 = weights.iter().sum();
        Ok(candidate_labels
            .iter()
            .zip(weights)
            .map(|(label, w)| {
                let score = if total > 0.0 { w / total } else { 0.0 };
                (label.to_string(), score)
            })
            .collect())
    }

    fn classify_batch(
        &self,
        texts: &[&str],
        candidate_labels: &[&str],
    ) -> Result<Vec<LabelScores>, ModelError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts
            .iter()
            .map(|text| self.classify(text, candidate_labels))
            .collect()
    }
}

fn to_scores(scores: &[(&str, f32)]) -> LabelScores {
    scores
        .iter()
        .map(|(label, score)| (label.to_string(), *score))
        .collect::<HashMap<_, _>>()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
