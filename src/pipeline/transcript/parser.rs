use std::sync::LazyLock;

use regex::Regex;

use super::sanitize::{normalize_quotes, remove_invisible_chars};
use super::types::{Annotation, Speaker, Transcript, Utterance};
use super::TranscriptError;

/// Longest speaker label accepted before the colon.
const MAX_LABEL_CHARS: usize = 32;

/// Speaker labels are at most this many words ("Dr. Anne Patel").
const MAX_LABEL_WORDS: usize = 3;

static SPEAKER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9.'\- ]*?)\s*:\s*(.*)$").expect("valid regex")
});

static ANNOTATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\[\]]+)\]$").expect("valid regex"));

/// Splits raw transcript text into speaker-attributed utterances.
///
/// Rules:
/// - `Label: text` starts a new turn; the label is mapped by [`Speaker::from_label`].
///   A label that maps to no known speaker must be capitalized and not be
///   followed by a number, otherwise the line is continuation text.
/// - A line without a speaker prefix continues the previous turn.
/// - A line that is entirely `[bracketed]` is kept as an [`Annotation`].
/// - Lines before the first turn that are neither are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct TranscriptParser;

impl TranscriptParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &str) -> Result<Transcript, TranscriptError> {
        parse_transcript(raw)
    }
}

/// Pending turn before empty turns are filtered out.
struct Turn {
    speaker: Speaker,
    text: String,
}

pub fn parse_transcript(raw: &str) -> Result<Transcript, TranscriptError> {
    if raw.trim().is_empty() {
        return Err(TranscriptError::EmptyInput);
    }

    let cleaned = normalize_quotes(&remove_invisible_chars(raw));
    let mut turns: Vec<Turn> = Vec::new();
    // (annotation text, number of raw turns before it)
    let mut pending_annotations: Vec<(String, usize)> = Vec::new();
    let mut orphan_lines = 0usize;

    for line in cleaned.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = ANNOTATION_LINE.captures(trimmed) {
            pending_annotations.push((caps[1].trim().to_string(), turns.len()));
            continue;
        }

        if let Some((speaker, text)) = split_speaker(trimmed) {
            turns.push(Turn {
                speaker,
                text: text.to_string(),
            });
            continue;
        }

        match turns.last_mut() {
            Some(turn) => {
                if !turn.text.is_empty() {
                    turn.text.push(' ');
                }
                turn.text.push_str(trimmed);
            }
            None => orphan_lines += 1,
        }
    }

    if orphan_lines > 0 {
        tracing::debug!(orphan_lines, "Dropped lines preceding the first speaker turn");
    }

    // Keep only turns with content, remembering how many survive before each raw index.
    let mut kept_before = Vec::with_capacity(turns.len() + 1);
    let mut utterances = Vec::with_capacity(turns.len());
    for turn in turns {
        kept_before.push(utterances.len());
        if !turn.text.is_empty() {
            let order_index = utterances.len();
            utterances.push(Utterance {
                speaker: turn.speaker,
                text: turn.text,
                order_index,
            });
        }
    }
    kept_before.push(utterances.len());

    if utterances.is_empty() {
        return Err(TranscriptError::NoUtterances);
    }

    let annotations = pending_annotations
        .into_iter()
        .map(|(text, raw_position)| Annotation {
            text,
            position: kept_before[raw_position],
        })
        .collect();

    tracing::debug!(utterances = utterances.len(), "Parsed transcript");

    Ok(Transcript {
        raw: raw.to_string(),
        utterances,
        annotations,
    })
}

/// Split `Label: text` into a speaker and the remaining text.
fn split_speaker(line: &str) -> Option<(Speaker, &str)> {
    let caps = SPEAKER_LINE.captures(line)?;
    let label = caps.get(1)?.as_str().trim();
    if label.len() > MAX_LABEL_CHARS || label.split_whitespace().count() > MAX_LABEL_WORDS {
        return None;
    }
    let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    let speaker = Speaker::from_label(label);
    if speaker == Speaker::Unknown && !is_unknown_speaker_label(label, text) {
        return None;
    }
    Some((speaker, text))
}

/// Unrecognized labels only start a turn when written like a name
/// ("Nurse", "Mother In Law") and not followed by a figure, so
/// "Ibuprofen: 400 mg twice daily" stays inside the current turn.
fn is_unknown_speaker_label(label: &str, text: &str) -> bool {
    let capitalized = label
        .split_whitespace()
        .all(|word| word.chars().next().is_some_and(char::is_uppercase));
    let figure = text.chars().next().is_some_and(|c| c.is_ascii_digit());
    capitalized && !figure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_speaker_turns_in_order() {
        let t = parse_transcript(
            "Doctor: How are you feeling?\nPatient: My knee hurts.\nDoctor: Let's take a look.",
        )
        .unwrap();

        assert_eq!(t.utterances.len(), 3);
        assert_eq!(t.utterances[0].speaker, Speaker::Doctor);
        assert_eq!(t.utterances[1].speaker, Speaker::Patient);
        assert_eq!(t.utterances[1].text, "My knee hurts.");
        for (i, u) in t.utterances.iter().enumerate() {
            assert_eq!(u.order_index, i);
        }
    }

    #[test]
    fn continuation_lines_join_previous_turn() {
        let t = parse_transcript(
            "Patient: It started two weeks ago\nand has been getting worse\n\nDoctor: I see.",
        )
        .unwrap();

        assert_eq!(t.utterances.len(), 2);
        assert_eq!(
            t.utterances[0].text,
            "It started two weeks ago and has been getting worse"
        );
    }

    #[test]
    fn unrecognized_labels_map_to_unknown() {
        let t = parse_transcript("Nurse: Blood pressure is 120 over 80.\nPatient: Thanks.").unwrap();
        assert_eq!(t.utterances[0].speaker, Speaker::Unknown);
        assert_eq!(t.utterances[1].speaker, Speaker::Patient);
    }

    #[test]
    fn dosage_lines_continue_the_turn() {
        let t = parse_transcript(
            "Patient: They gave me some tablets.\nIbuprofen: 400 mg twice daily\nblood pressure: fine\nDoctor: Good.",
        )
        .unwrap();

        assert_eq!(t.utterances.len(), 2);
        assert_eq!(t.utterances[0].speaker, Speaker::Patient);
        assert_eq!(
            t.utterances[0].text,
            "They gave me some tablets. Ibuprofen: 400 mg twice daily blood pressure: fine"
        );
    }

    #[test]
    fn physician_label_is_doctor() {
        let t = parse_transcript("Physician: Good morning, Ms. Jones.").unwrap();
        assert_eq!(t.utterances[0].speaker, Speaker::Doctor);
    }

    #[test]
    fn empty_input_is_parse_error() {
        assert_eq!(parse_transcript(""), Err(TranscriptError::EmptyInput));
        assert_eq!(parse_transcript("  \n\t "), Err(TranscriptError::EmptyInput));
    }

    #[test]
    fn text_without_speakers_is_parse_error() {
        let err = parse_transcript("just some notes\nwithout any speaker labels at all").unwrap_err();
        assert_eq!(err, TranscriptError::NoUtterances);
    }

    #[test]
    fn long_prefix_is_not_a_speaker() {
        let t = parse_transcript(
            "Patient: I keep a diary.\nThe thing I wrote down this morning was: knee pain",
        )
        .unwrap();
        assert_eq!(t.utterances.len(), 1);
        assert!(t.utterances[0].text.ends_with("knee pain"));
    }

    #[test]
    fn annotations_are_kept_with_position() {
        let t = parse_transcript(
            "Doctor: Let's examine you.\nPatient: Okay.\n[Physical Examination Conducted]\nDoctor: Full range of movement.",
        )
        .unwrap();

        assert_eq!(t.utterances.len(), 3);
        assert_eq!(t.annotations.len(), 1);
        assert_eq!(t.annotations[0].text, "Physical Examination Conducted");
        assert_eq!(t.annotations[0].position, 2);
        assert_eq!(t.examination_start(), Some(2));
    }

    #[test]
    fn empty_turns_are_dropped_and_positions_follow() {
        let t = parse_transcript("Doctor:\nPatient: Hello.\n[Exam]\nDoctor: Done.").unwrap();
        assert_eq!(t.utterances.len(), 2);
        assert_eq!(t.utterances[0].speaker, Speaker::Patient);
        assert_eq!(t.utterances[1].order_index, 1);
        assert_eq!(t.annotations[0].position, 1);
    }

    #[test]
    fn leading_lines_before_first_turn_are_dropped() {
        let t = parse_transcript("Consultation transcript\nDoctor: Hello.").unwrap();
        assert_eq!(t.utterances.len(), 1);
        assert_eq!(t.utterances[0].text, "Hello.");
    }

    #[test]
    fn indented_lines_are_trimmed() {
        let t = parse_transcript("    Doctor: Hello.\n    Patient: Hi, doctor.").unwrap();
        assert_eq!(t.utterances.len(), 2);
        assert_eq!(t.utterances[1].text, "Hi, doctor.");
    }

    #[test]
    fn raw_text_is_preserved() {
        let raw = "Doctor: Hello.\u{200B}";
        let t = parse_transcript(raw).unwrap();
        assert_eq!(t.raw, raw);
        assert_eq!(t.utterances[0].text, "Hello.");
    }

    #[test]
    fn typographic_apostrophes_normalized() {
        let t = parse_transcript("Patient: It\u{2019}s not constant.").unwrap();
        assert_eq!(t.utterances[0].text, "It's not constant.");
    }

    #[test]
    fn parser_struct_delegates() {
        let parser = TranscriptParser::new();
        assert!(parser.parse("Patient: Hi").is_ok());
    }
}
