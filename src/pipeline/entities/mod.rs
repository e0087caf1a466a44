//! Clinical entity extraction: symptoms, diagnoses, treatments, prognosis
//! and current status, each traced back to the utterances that support it.

pub mod extractor;
pub mod types;
pub mod vocabulary;

pub use extractor::ClinicalEntityExtractor;
pub use types::{ClinicalSummary, EvidenceSpan, ExtractionWarning, SummaryField};
pub use vocabulary::treatment_terms;
