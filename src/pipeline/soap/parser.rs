//! Reading SOAP sections out of raw model output.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{SoapNote, SoapParseError, SoapSection};

/// `SUBJECTIVE:`, `**Plan:**`, `## Assessment`, `Objective` alone on a line.
static SECTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*|__)?[ \t]*(subjective|objective|assessment|plan)\b[ \t]*(?:\*\*|__)?[ \t]*(?::[ \t]*(?:\*\*|__)?|$)",
    )
    .expect("valid regex")
});

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?(?:</think>|$)").expect("valid regex"));

static UNUSED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<unused\d+>").expect("valid regex"));

static CODE_FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z]*[ \t]*$").expect("valid regex"));

/// Strip model artifacts before section parsing.
///
/// Handles `<think>...</think>` blocks, Gemma `<unusedN>thought` prefixes and
/// stray `<unusedN>` tokens, code fence lines, and `\r\n` line endings.
pub fn sanitize_generation_output(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n");

    text = THINK_BLOCK.replace_all(&text, "").into_owned();

    if let Some(idx) = text.find("<unused") {
        if let Some(thought_offset) = text[idx..].find("thought\n") {
            text = text[idx + thought_offset + "thought\n".len()..].to_string();
        }
    }
    text = UNUSED_TOKEN.replace_all(&text, "").into_owned();
    text = CODE_FENCE_LINE.replace_all(&text, "").into_owned();

    text.trim().to_string()
}

/// Parse a model response into a complete [`SoapNote`].
///
/// Section markers are located first; the first non-empty occurrence of each
/// section wins. A response without any markers is tried as a JSON object
/// with `subjective`/`objective`/`assessment`/`plan` keys.
pub fn parse_soap_response(raw: &str) -> Result<SoapNote, SoapParseError> {
    let text = sanitize_generation_output(raw);
    let markers: Vec<(SoapSection, usize, usize)> = SECTION_MARKER
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let section = SoapSection::from_name(caps.get(1)?.as_str())?;
            Some((section, whole.start(), whole.end()))
        })
        .collect();

    let mut found: [Option<String>; 4] = Default::default();
    if markers.is_empty() {
        found = parse_json_sections(&text).ok_or(SoapParseError::NoSections)?;
    } else {
        for (i, (section, _, body_start)) in markers.iter().enumerate() {
            let body_end = markers.get(i + 1).map_or(text.len(), |next| next.1);
            let body = clean_body(&text[*body_start..body_end]);
            let slot = &mut found[*section as usize];
            if slot.as_deref().map_or(true, str::is_empty) {
                *slot = Some(body);
            }
        }
    }

    build_note(found)
}

fn build_note(found: [Option<String>; 4]) -> Result<SoapNote, SoapParseError> {
    let missing: Vec<SoapSection> = SoapSection::ALL
        .into_iter()
        .filter(|s| found[*s as usize].is_none())
        .collect();
    if !missing.is_empty() {
        return Err(SoapParseError::MissingSections(missing));
    }
    let empty: Vec<SoapSection> = SoapSection::ALL
        .into_iter()
        .filter(|s| found[*s as usize].as_deref().is_some_and(str::is_empty))
        .collect();
    if !empty.is_empty() {
        return Err(SoapParseError::EmptySections(empty));
    }

    let [Some(subjective), Some(objective), Some(assessment), Some(plan)] = found else {
        return Err(SoapParseError::NoSections);
    };
    Ok(SoapNote {
        subjective,
        objective,
        assessment,
        plan,
    })
}

/// Section text with surrounding whitespace and stray emphasis removed.
fn clean_body(body: &str) -> String {
    body.trim()
        .trim_start_matches(['*', '_', ':'])
        .trim_end_matches(['*', '_', '-'])
        .trim()
        .to_string()
}

fn parse_json_sections(text: &str) -> Option<[Option<String>; 4]> {
    let block = extract_json_block(text)?;
    let value: serde_json::Value = serde_json::from_str(block).ok()?;
    let object = value.as_object()?;

    let mut found: [Option<String>; 4] = Default::default();
    for (key, value) in object {
        let Some(section) = SoapSection::from_name(key) else { continue };
        found[section as usize] = Some(json_text(value).trim().to_string());
    }
    found.iter().any(Option::is_some).then_some(found)
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(json_text)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The outermost `{...}` span in the text, if any.
fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "SUBJECTIVE: Sharp knee pain for two weeks; patient is worried.\n\
OBJECTIVE: No examination findings recorded.\n\
ASSESSMENT: Knee pain, cause not yet determined.\n\
PLAN: Start ibuprofen. Review if not improving.";

    #[test]
    fn parses_plain_markers() {
        let note = parse_soap_response(WELL_FORMED).unwrap();
        assert_eq!(note.subjective, "Sharp knee pain for two weeks; patient is worried.");
        assert_eq!(note.plan, "Start ibuprofen. Review if not improving.");
    }

    #[test]
    fn parses_markdown_headings_and_bold() {
        let raw = "## Subjective\nKnee pain.\n\n**Objective:**\nNot examined.\n\n**Assessment**:\nLikely strain.\n\n### PLAN\n- Ibuprofen 400 mg\n- Rest";
        let note = parse_soap_response(raw).unwrap();
        assert_eq!(note.subjective, "Knee pain.");
        assert_eq!(note.objective, "Not examined.");
        assert_eq!(note.assessment, "Likely strain.");
        assert_eq!(note.plan, "- Ibuprofen 400 mg\n- Rest");
    }

    #[test]
    fn multiline_sections_and_crlf() {
        let raw = "Subjective:\r\nLine one.\r\nLine two.\r\nObjective: Normal gait.\r\nAssessment: Strain.\r\nPlan: Rest.";
        let note = parse_soap_response(raw).unwrap();
        assert_eq!(note.subjective, "Line one.\nLine two.");
        assert_eq!(note.objective, "Normal gait.");
    }

    #[test]
    fn missing_section_is_reported() {
        let raw = "SUBJECTIVE: Pain.\nOBJECTIVE: None.\nASSESSMENT: Strain.";
        assert_eq!(
            parse_soap_response(raw),
            Err(SoapParseError::MissingSections(vec![SoapSection::Plan]))
        );
    }

    #[test]
    fn empty_section_is_reported() {
        let raw = "SUBJECTIVE: Pain.\nOBJECTIVE:\nASSESSMENT: Strain.\nPLAN: Rest.";
        assert_eq!(
            parse_soap_response(raw),
            Err(SoapParseError::EmptySections(vec![SoapSection::Objective]))
        );
    }

    #[test]
    fn first_non_empty_occurrence_wins() {
        let raw = "SUBJECTIVE:\nOBJECTIVE: Fine.\nSUBJECTIVE: Knee pain.\nASSESSMENT: Strain.\nPLAN: Rest.\nPLAN: Something else.";
        let note = parse_soap_response(raw).unwrap();
        assert_eq!(note.subjective, "Knee pain.");
        assert_eq!(note.plan, "Rest.");
    }

    #[test]
    fn words_inside_sentences_are_not_markers() {
        let raw = "SUBJECTIVE: The plan: see above.\nOBJECTIVE: x\nASSESSMENT: y\nPLAN: z";
        let note = parse_soap_response(raw).unwrap();
        assert_eq!(note.subjective, "The plan: see above.");
    }

    #[test]
    fn prose_without_markers_is_no_sections() {
        assert_eq!(
            parse_soap_response("I'm sorry, I can't help with that."),
            Err(SoapParseError::NoSections)
        );
        assert_eq!(parse_soap_response(""), Err(SoapParseError::NoSections));
    }

    #[test]
    fn json_object_fallback() {
        let raw = "```json\n{\"subjective\": \"Knee pain\", \"objective\": \"Not examined\", \"Assessment\": \"Strain\", \"plan\": [\"Ibuprofen\", \"Rest\"]}\n```";
        let note = parse_soap_response(raw).unwrap();
        assert_eq!(note.assessment, "Strain");
        assert_eq!(note.plan, "Ibuprofen\nRest");
    }

    #[test]
    fn json_with_missing_key_is_missing_section() {
        let raw = "{\"subjective\": \"a\", \"objective\": \"b\", \"assessment\": \"c\"}";
        assert_eq!(
            parse_soap_response(raw),
            Err(SoapParseError::MissingSections(vec![SoapSection::Plan]))
        );
    }

    #[test]
    fn thinking_blocks_are_stripped() {
        let raw = format!("<think>The plan: maybe mention surgery?</think>\n{WELL_FORMED}");
        let note = parse_soap_response(&raw).unwrap();
        assert!(!note.plan.contains("surgery"));

        let gemma = format!("<unused94>thought\nPLAN: draft\n<unused95>{WELL_FORMED}");
        assert_eq!(sanitize_generation_output(&gemma).lines().next(), Some("PLAN: draft"));
    }

    #[test]
    fn unclosed_think_block_removes_rest() {
        assert_eq!(sanitize_generation_output("<think>still reasoning"), "");
    }

    #[test]
    fn fences_are_removed() {
        let raw = format!("```\n{WELL_FORMED}\n```");
        let note = parse_soap_response(&raw).unwrap();
        assert_eq!(note.plan, "Start ibuprofen. Review if not improving.");
    }

    #[test]
    fn json_block_bounds() {
        assert_eq!(extract_json_block("Result: {\"a\": 1} done"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_block("No JSON here at all."), None);
    }
}
