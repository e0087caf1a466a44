use std::ops::Range;

use crate::pipeline::transcript::{Speaker, Utterance};

use super::types::{ClinicalSummary, EvidenceSpan, ExtractionWarning, SummaryField};
use super::vocabulary::{patterns_for, GENERIC_PAIN};

/// Fields scanned, in the order their vocabularies are applied.
const FIELDS: [SummaryField; 6] = [
    SummaryField::PatientName,
    SummaryField::Symptoms,
    SummaryField::Diagnosis,
    SummaryField::Treatments,
    SummaryField::Prognosis,
    SummaryField::CurrentStatus,
];

/// Fields that produce a warning when nothing matched.
const REPORTED_FIELDS: [SummaryField; 5] = [
    SummaryField::Symptoms,
    SummaryField::Diagnosis,
    SummaryField::Treatments,
    SummaryField::Prognosis,
    SummaryField::CurrentStatus,
];

/// A negator this many words before a match (same clause) cancels it.
const NEGATION_WINDOW: usize = 4;

const CLAUSE_BREAKS: &[char] = &['.', ';', ':', '!', '?', ',', '(', '\u{2014}', '\u{2013}'];

/// One vocabulary hit before it is folded into the summary.
struct Candidate {
    field: SummaryField,
    utterance_index: usize,
    speaker: Speaker,
    start: usize,
    matched_text: String,
    values: Vec<String>,
}

/// Rule-based extraction of clinical facts from a parsed conversation.
///
/// Both speakers are scanned (diagnoses and treatments usually come from the
/// doctor, symptoms from the patient) except for current status, which is
/// patient-only, and the patient's name, which is taken from how the doctor
/// addresses them. Output is deterministic for a given input.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClinicalEntityExtractor;

impl ClinicalEntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, utterances: &[Utterance]) -> ClinicalSummary {
        let mut candidates = Vec::new();
        for field in FIELDS {
            for utterance in utterances.iter().filter(|u| scans_speaker(field, u.speaker)) {
                collect_matches(field, utterance, &mut candidates);
            }
        }
        // Stable: ties keep field order.
        candidates.sort_by_key(|c| (c.utterance_index, c.start));

        let summary = assemble(&candidates);

        tracing::debug!(
            candidates = candidates.len(),
            symptoms = summary.symptoms.len(),
            diagnoses = summary.diagnoses.len(),
            treatments = summary.treatments.len(),
            has_prognosis = summary.prognosis.is_some(),
            warnings = summary.warnings.len(),
            "Extracted clinical summary"
        );

        summary
    }
}

fn scans_speaker(field: SummaryField, speaker: Speaker) -> bool {
    match field {
        SummaryField::PatientName => speaker == Speaker::Doctor,
        SummaryField::CurrentStatus => speaker == Speaker::Patient,
        _ => true,
    }
}

/// Names are matched verbatim; clinical terms are screened for negation and questions.
fn screens_context(field: SummaryField) -> bool {
    field != SummaryField::PatientName
}

fn collect_matches(field: SummaryField, utterance: &Utterance, out: &mut Vec<Candidate>) {
    let text = utterance.text.as_str();
    let mut covered: Vec<Range<usize>> = Vec::new();

    for tp in patterns_for(field) {
        for caps in tp.regex.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            let range = m.range();
            if covered.iter().any(|r| r.start < range.end && range.start < r.end) {
                continue;
            }
            // A rejected match still claims its text so weaker patterns can't re-match it.
            covered.push(range.clone());

            let questioned =
                utterance.speaker == Speaker::Doctor && in_question(text, range.start, range.end);
            if screens_context(field) && (is_negated(text, range.start) || questioned) {
                tracing::debug!(
                    field = %field,
                    utterance = utterance.order_index,
                    "Skipped negated or questioned match"
                );
                continue;
            }

            let values = tp.normalize(&caps);
            if values.is_empty() {
                continue;
            }
            out.push(Candidate {
                field,
                utterance_index: utterance.order_index,
                speaker: utterance.speaker,
                start: range.start,
                matched_text: m.as_str().to_string(),
                values,
            });
        }
    }
}

/// True if a negator governing the match appears in the last few words of
/// its clause.
///
/// Determiners ("no", "without", "denies") always negate. A verbal negator
/// ("not", "never", "don't") only negates when it sits right before the match
/// or before a verb of having or perceiving ("don't have", "haven't had",
/// "isn't any"); "I can't stand this pain" is still a report of pain.
fn is_negated(text: &str, start: usize) -> bool {
    let prefix = &text[..start];
    let clause = prefix.rsplit(CLAUSE_BREAKS).next().unwrap_or(prefix);
    let words: Vec<String> = clause.split_whitespace().map(normalize_word).collect();
    let window = words.len().saturating_sub(NEGATION_WINDOW);

    words.iter().enumerate().skip(window).any(|(i, word)| {
        if is_determiner_negator(word) {
            return true;
        }
        if !is_verbal_negator(word) {
            return false;
        }
        match words[i + 1..].iter().find(|w| !is_hedge(w)) {
            None => true,
            Some(next) => is_governed_verb(next),
        }
    })
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .to_lowercase()
}

fn is_determiner_negator(word: &str) -> bool {
    matches!(
        word,
        "no" | "without" | "denies" | "denied" | "deny" | "denying" | "none" | "nor" | "neither"
    )
}

fn is_verbal_negator(word: &str) -> bool {
    matches!(word, "not" | "never" | "cannot") || word.ends_with("n't")
}

/// Adverbs allowed between a negator and its verb ("don't really have").
fn is_hedge(word: &str) -> bool {
    matches!(word, "really" | "actually" | "even" | "ever" | "currently" | "usually" | "always")
}

fn is_governed_verb(word: &str) -> bool {
    matches!(
        word,
        "any"
            | "have" | "has" | "had" | "having"
            | "feel" | "feels" | "felt" | "feeling"
            | "get" | "gets" | "got" | "getting"
            | "experience" | "experienced" | "experiencing"
            | "notice" | "noticed" | "noticing"
            | "see" | "saw" | "seen"
            | "suffer" | "suffered" | "suffering"
            | "show" | "shows" | "showed"
            | "do" | "did"
            | "take" | "took" | "taking"
            | "need" | "needed"
            | "use" | "used"
    )
}

/// Sentence openers that mark a real interrogative ("Any dizziness?",
/// "Are you still in pain?").
const QUESTION_OPENERS: &[&str] = &[
    "any", "anything", "are", "is", "am", "was", "were", "do", "does", "did", "have", "has",
    "had", "can", "could", "will", "would", "should",
];

/// Lead-in words skipped before looking for a question opener.
const SENTENCE_LEAD_INS: &[&str] = &["and", "so", "but", "also", "ok", "okay", "now", "then", "well"];

/// True if the match sits in a question that opens with an auxiliary or "any".
///
/// Tag questions ("Let's start ibuprofen, okay?") are statements and do not
/// count. Only applied to doctor turns.
fn in_question(text: &str, start: usize, end: usize) -> bool {
    if text[end..].chars().find(|c| matches!(c, '.' | '!' | '?')) != Some('?') {
        return false;
    }
    let sentence_start = text[..start]
        .rfind(['.', '!', '?'])
        .map_or(0, |i| i + 1);
    text[sentence_start..start]
        .split_whitespace()
        .map(normalize_word)
        .find(|w| !w.is_empty() && !SENTENCE_LEAD_INS.contains(&w.as_str()))
        .is_some_and(|w| QUESTION_OPENERS.contains(&w.as_str()))
}

fn assemble(candidates: &[Candidate]) -> ClinicalSummary {
    let mut summary = ClinicalSummary::default();
    // (name, votes) in order of first mention
    let mut name_votes: Vec<(String, usize)> = Vec::new();

    for candidate in candidates {
        for value in &candidate.values {
            match candidate.field {
                SummaryField::PatientName => match name_votes.iter_mut().find(|(n, _)| n == value) {
                    Some((_, votes)) => *votes += 1,
                    None => name_votes.push((value.clone(), 1)),
                },
                SummaryField::Symptoms => {
                    summary.symptoms.insert(value.clone());
                }
                SummaryField::Diagnosis => {
                    if !summary.diagnoses.contains(value) {
                        summary.diagnoses.push(value.clone());
                    }
                }
                SummaryField::Treatments => {
                    summary.treatments.insert(value.clone());
                }
                SummaryField::Prognosis => {
                    if summary.prognosis.is_none() {
                        summary.prognosis = Some(value.clone());
                    }
                }
                // Later statements supersede earlier ones.
                SummaryField::CurrentStatus => summary.current_status = Some(value.clone()),
            }
        }
    }

    if summary.symptoms.iter().any(|s| is_located_pain(s)) {
        summary.symptoms.remove(GENERIC_PAIN);
    }

    summary.diagnosis = summary.diagnoses.first().cloned();
    summary.patient_name = majority_name(&name_votes);

    for candidate in candidates {
        for value in &candidate.values {
            if !is_reported(&summary, candidate.field, value) {
                continue;
            }
            summary
                .evidence_spans
                .entry(candidate.field)
                .or_default()
                .push(EvidenceSpan {
                    utterance_index: candidate.utterance_index,
                    speaker: candidate.speaker,
                    matched_text: candidate.matched_text.clone(),
                    normalized: value.clone(),
                });
        }
    }

    for field in REPORTED_FIELDS {
        if summary.evidence_for(field).is_empty() {
            summary.warnings.push(ExtractionWarning::NoEntitiesFound { field });
        }
    }
    if let [first, _, ..] = summary.diagnoses.as_slice() {
        summary.warnings.push(ExtractionWarning::MultipleDiagnoses {
            candidates: summary.diagnoses.clone(),
            selected: first.clone(),
        });
    }

    summary
}

fn is_located_pain(symptom: &str) -> bool {
    symptom.ends_with(" pain") || symptom == "headache" || symptom == "sore throat"
}

/// Most-voted name; ties go to the name mentioned first.
fn majority_name(votes: &[(String, usize)]) -> Option<String> {
    let mut best: Option<&(String, usize)> = None;
    for entry in votes {
        match best {
            Some(b) if entry.1 <= b.1 => {}
            _ => best = Some(entry),
        }
    }
    best.map(|(name, _)| name.clone())
}

fn is_reported(summary: &ClinicalSummary, field: SummaryField, value: &str) -> bool {
    match field {
        SummaryField::PatientName => summary.patient_name.as_deref() == Some(value),
        SummaryField::Symptoms => summary.symptoms.contains(value),
        SummaryField::Diagnosis => summary.diagnoses.iter().any(|d| d == value),
        SummaryField::Treatments => summary.treatments.contains(value),
        SummaryField::Prognosis => summary.prognosis.as_deref() == Some(value),
        SummaryField::CurrentStatus => summary.current_status.as_deref() == Some(value),
    }
}
