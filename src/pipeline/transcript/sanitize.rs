// Clean transcript text before parsing and before it is embedded in a prompt.
// Removes invisible Unicode and neutralizes instruction-override phrases.

use std::sync::LazyLock;

use regex::Regex;

/// Remove invisible Unicode characters and non-whitespace control characters.
/// Preserves space, newline, tab and carriage return.
pub fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if matches!(*c, ' ' | '\n' | '\t' | '\r') {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' // Zero-width chars, directional marks
                | '\u{202A}'..='\u{202E}' // Directional formatting
                | '\u{2060}'..='\u{2064}' // Word joiner, invisible operators
                | '\u{FEFF}' // BOM
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

/// Replace typographic quotes and apostrophes with their ASCII forms so
/// vocabulary patterns see `it's` whatever keyboard produced it.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}

static OVERRIDE_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ignore|disregard|forget)\s+(?:all\s+|the\s+above\s+|your\s+|previous\s+)*instructions\b|\bnew\s+instructions\s*:|\bsystem\s+prompt\b",
    )
    .expect("valid regex")
});

/// Replace instruction-override phrases in utterance text with a marker.
///
/// Returns the cleaned text and the number of replacements. Transcript
/// content is never logged here; callers log counts only.
pub fn neutralize_override_phrases(text: &str) -> (String, usize) {
    let count = OVERRIDE_PHRASES.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (OVERRIDE_PHRASES.replace_all(text, "[removed]").into_owned(), count)
}
