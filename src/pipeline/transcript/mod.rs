//! Transcript parsing: raw speaker-prefixed text -> ordered utterances.

pub mod parser;
pub mod sanitize;
pub mod types;

pub use parser::{parse_transcript, TranscriptParser};
pub use sanitize::neutralize_override_phrases;
pub use types::*;

use thiserror::Error;

/// Fatal parse failure. The pipeline aborts and surfaces it verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("Transcript is empty")]
    EmptyInput,

    #[error("Transcript contains no speaker-prefixed utterances")]
    NoUtterances,
}
