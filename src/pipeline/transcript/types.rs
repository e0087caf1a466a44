use serde::{Deserialize, Serialize};

/// Who said an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Doctor,
    Patient,
    Unknown,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Doctor => "doctor",
            Speaker::Patient => "patient",
            Speaker::Unknown => "unknown",
        }
    }

    /// Map a speaker label (the text before the colon) to a speaker.
    ///
    /// `Doctor`, `Physician`, `Dr`, `Dr. Name`, `Clinician` and `Provider`
    /// are doctors; `Patient` and `Pt` are patients; anything else is unknown.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().trim_end_matches('.').to_lowercase();
        let first = normalized
            .split(|c: char| c.is_whitespace() || c == '.')
            .next()
            .unwrap_or("");

        match first {
            "doctor" | "physician" | "dr" | "clinician" | "provider" => Speaker::Doctor,
            "patient" | "pt" => Speaker::Patient,
            _ => Speaker::Unknown,
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One speaker turn. Immutable once parsed; `order_index` is its position
/// in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
    pub order_index: usize,
}

/// A bracketed stage direction such as `[Physical Examination Conducted]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    /// Number of utterances that precede the annotation.
    pub position: usize,
}

impl Annotation {
    /// Marks the start of examination findings.
    pub fn is_physical_exam(&self) -> bool {
        let lower = self.text.to_lowercase();
        lower.contains("examination") || lower.contains("physical exam")
    }
}

/// A parsed transcript: the original text plus its ordered utterances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub raw: String,
    pub utterances: Vec<Utterance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Transcript {
    /// Utterances spoken by the patient, in order.
    pub fn patient_utterances(&self) -> Vec<&Utterance> {
        self.by_speaker(Speaker::Patient)
    }

    pub fn by_speaker(&self, speaker: Speaker) -> Vec<&Utterance> {
        self.utterances
            .iter()
            .filter(|u| u.speaker == speaker)
            .collect()
    }

    /// Index of the first utterance after a physical-examination annotation.
    pub fn examination_start(&self) -> Option<usize> {
        self.annotations
            .iter()
            .find(|a| a.is_physical_exam())
            .map(|a| a.position)
    }
}
