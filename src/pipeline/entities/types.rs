use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::pipeline::transcript::Speaker;

/// Summary fields that carry evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryField {
    PatientName,
    Symptoms,
    Diagnosis,
    Treatments,
    Prognosis,
    CurrentStatus,
}

impl SummaryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryField::PatientName => "patient_name",
            SummaryField::Symptoms => "symptoms",
            SummaryField::Diagnosis => "diagnosis",
            SummaryField::Treatments => "treatments",
            SummaryField::Prognosis => "prognosis",
            SummaryField::CurrentStatus => "current_status",
        }
    }
}

impl std::fmt::Display for SummaryField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an extracted value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    /// `order_index` of the utterance that contains the match.
    pub utterance_index: usize,
    pub speaker: Speaker,
    /// Text as written in the utterance.
    pub matched_text: String,
    /// Normalized form the match contributed to the summary.
    pub normalized: String,
}

/// Non-fatal extraction outcomes, recorded on the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// Nothing in the transcript matched this field's vocabulary.
    NoEntitiesFound { field: SummaryField },
    /// More than one diagnosis was mentioned; `selected` is the first one.
    MultipleDiagnoses {
        candidates: Vec<String>,
        selected: String,
    },
}

/// Structured facts extracted from a transcript.
///
/// Every populated field has at least one entry in `evidence_spans`.
/// Empty fields stay empty (or absent) rather than being guessed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClinicalSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    pub symptoms: BTreeSet<String>,
    /// First-mentioned diagnosis; all candidates are kept in `diagnoses`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    /// Every diagnosis mentioned, deduplicated, in order of first mention.
    #[serde(default)]
    pub diagnoses: Vec<String>,
    pub treatments: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prognosis: Option<String>,
    /// Most recent patient statement of ongoing symptoms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
    pub evidence_spans: BTreeMap<SummaryField, Vec<EvidenceSpan>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,
}

impl ClinicalSummary {
    pub fn evidence_for(&self, field: SummaryField) -> &[EvidenceSpan] {
        self.evidence_spans
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when no clinical field (symptoms through prognosis) was populated.
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
            && self.diagnoses.is_empty()
            && self.treatments.is_empty()
            && self.prognosis.is_none()
    }
}
