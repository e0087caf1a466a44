use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A closed set of labels offered to the zero-shot model.
pub trait CandidateLabel: Copy + PartialEq + 'static {
    /// Text sent to the model and used in serialized output.
    fn as_str(&self) -> &'static str;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} label: {value}")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

/// Generates a label enum whose serialized form is the label text itself.
macro_rules! label_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $s)]
                $variant
            ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];
        }

        impl CandidateLabel for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|label| label.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownLabel {
                        kind: stringify!($name),
                        value: s.into(),
                    })
            }
        }
    };
}

label_enum!(Sentiment {
    Anxious => "Anxious",
    Neutral => "Neutral",
    Reassured => "Reassured",
    Concerned => "Concerned",
});

label_enum!(Intent {
    ReportingSymptoms => "Reporting symptoms",
    SeekingReassurance => "Seeking reassurance",
    ExpressingConcern => "Expressing concern",
    ExpressingRelief => "Expressing relief",
    Unclear => "Unclear",
});

/// Which label set a decision belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sentiment,
    Intent,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Sentiment => f.write_str("sentiment"),
            Dimension::Intent => f.write_str("intent"),
        }
    }
}

/// Why a reported label is the configured fallback rather than the model's pick.
/// Non-fatal; recorded on the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationFallback {
    /// The best aggregated score did not exceed the acceptance threshold.
    LowConfidence {
        dimension: Dimension,
        best_label: String,
        score: f32,
        threshold: f32,
    },
    /// The transcript has no patient turns to classify.
    NoPatientUtterances,
    /// The classification model failed or returned unusable output.
    ModelUnavailable { dimension: Dimension, error: String },
}

/// Dialogue-level sentiment and intent of the patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentIntentResult {
    pub sentiment: Sentiment,
    pub intent: Intent,
    /// Aggregated score of the winning candidate, in `[0, 1]`.
    pub sentiment_confidence: f32,
    pub intent_confidence: f32,
    /// Number of patient utterances scored.
    pub analyzed_utterances: usize,
    /// `order_index` of the most expressive patient utterance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_utterance: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<ClassificationFallback>,
}
