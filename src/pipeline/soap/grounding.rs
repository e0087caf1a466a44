use crate::pipeline::entities::treatment_terms;
use crate::pipeline::transcript::Transcript;

use super::types::SoapNote;

/// Treatment terms the note mentions that appear nowhere in the transcript.
///
/// Best-effort: terms are compared in normalized form, so brand and generic
/// names of the same drug count as the same term.
pub fn ungrounded_terms(note: &SoapNote, transcript: &Transcript) -> Vec<String> {
    let source: String = transcript
        .utterances
        .iter()
        .map(|u| u.text.as_str())
        .chain(transcript.annotations.iter().map(|a| a.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n");
    let grounded = treatment_terms(&source);

    treatment_terms(&note.to_text())
        .into_iter()
        .filter(|term| !grounded.contains(term))
        .collect()
}
