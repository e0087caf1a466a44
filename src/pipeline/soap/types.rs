use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::ModelError;

/// The four SOAP sections, in note order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoapSection {
    Subjective,
    Objective,
    Assessment,
    Plan,
}

impl SoapSection {
    pub const ALL: [SoapSection; 4] = [
        SoapSection::Subjective,
        SoapSection::Objective,
        SoapSection::Assessment,
        SoapSection::Plan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoapSection::Subjective => "subjective",
            SoapSection::Objective => "objective",
            SoapSection::Assessment => "assessment",
            SoapSection::Plan => "plan",
        }
    }

    /// Marker the model is asked to emit, e.g. `SUBJECTIVE`.
    pub fn heading(&self) -> &'static str {
        match self {
            SoapSection::Subjective => "SUBJECTIVE",
            SoapSection::Objective => "OBJECTIVE",
            SoapSection::Assessment => "ASSESSMENT",
            SoapSection::Plan => "PLAN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for SoapSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.heading())
    }
}

/// A complete SOAP note. Only constructed with all four sections non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

impl SoapNote {
    pub fn section(&self, section: SoapSection) -> &str {
        match section {
            SoapSection::Subjective => &self.subjective,
            SoapSection::Objective => &self.objective,
            SoapSection::Assessment => &self.assessment,
            SoapSection::Plan => &self.plan,
        }
    }

    /// Plain-text rendering with one labeled block per section.
    pub fn to_text(&self) -> String {
        SoapSection::ALL
            .iter()
            .map(|s| format!("{}:\n{}", s.heading(), self.section(*s)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Metadata about how a note was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub model: String,
    /// Model calls made, including the successful one.
    pub attempts: u32,
    /// Treatment terms in the note that the transcript never mentions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ungrounded_terms: Vec<String>,
    /// Instruction-like phrases removed from the transcript before prompting.
    #[serde(default)]
    pub neutralized_phrases: usize,
}

/// Why a model response could not be read as a SOAP note.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoapParseError {
    #[error("Response is missing section(s): {}", join_sections(.0))]
    MissingSections(Vec<SoapSection>),

    #[error("Response has empty section(s): {}", join_sections(.0))]
    EmptySections(Vec<SoapSection>),

    #[error("Response contains no SOAP section markers")]
    NoSections,
}

fn join_sections(sections: &[SoapSection]) -> String {
    sections
        .iter()
        .map(|s| s.heading())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fatal for a pipeline run: no note was produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("No well-formed SOAP note after {attempts} attempt(s): {last_failure}")]
    Exhausted { attempts: u32, last_failure: String },

    #[error("Generation model failed: {0}")]
    Model(#[from] ModelError),
}
