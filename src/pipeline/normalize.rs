//! Response normalisation: strip wrapping artefacts from the model text.
//!
//! Even when told "no markdown fences", models regularly answer with
//!
//! ````text
//! ```json
//! [ … ]
//! ```
//! ````
//!
//! This stage removes every fence delimiter (with or without a language
//! tag), then trims whitespace and invisible Unicode (BOM, zero-width
//! spaces) from both ends. Cell values are left as the model wrote them. It is total: it never fails and never judges whether what
//! remains is JSON. Text without fences (including the inference fault
//! sentinel) passes through with only whitespace trimmed.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to the raw response.
///
/// Rules (applied in order):
/// 1. Remove code-fence delimiters (```` ```json ````, ```` ``` ````)
/// 2. Trim whitespace and invisible Unicode from both ends
pub fn normalize_response(raw: &str) -> String {
    let s = strip_code_fences(raw);
    s.trim_matches(is_wrapper_char).to_string()
}

// ── Rule 1: Strip code fences ────────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)```[ \t]*(?:json)?").unwrap());

fn strip_code_fences(input: &str) -> String {
    RE_FENCE.replace_all(input, "").into_owned()
}

// ── Rule 2: Trim the wrapper ────────────────────────────────────────────────

const INVISIBLE: [char; 4] = ['\u{FEFF}', '\u{200B}', '\u{2060}', '\u{00AD}'];

fn is_wrapper_char(c: char) -> bool {
    c.is_whitespace() || INVISIBLE.contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let input = "```json\n[{\"stt\":\"1\"}]\n```";
        assert_eq!(normalize_response(input), "[{\"stt\":\"1\"}]");
    }

    #[test]
    fn strips_bare_and_uppercase_fences() {
        assert_eq!(normalize_response("```\n[]\n```\n"), "[]");
        assert_eq!(normalize_response("```JSON\n[]\n```"), "[]");
    }

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(normalize_response("Error: timeout"), "Error: timeout");
        assert_eq!(normalize_response("  [1, 2]  \n"), "[1, 2]");
    }

    #[test]
    fn trims_invisible_wrapper_but_keeps_values() {
        let input = "\u{FEFF}\u{200B}[{\"ten_nv\":\"Nguy\u{200C}en\u{00AD}\"}]\u{200B}\n";
        assert_eq!(
            normalize_response(input),
            "[{\"ten_nv\":\"Nguy\u{200C}en\u{00AD}\"}]"
        );
    }

    #[test]
    fn never_fails_on_odd_input() {
        assert_eq!(normalize_response(""), "");
        assert_eq!(normalize_response("``````"), "");
        assert_eq!(normalize_response("``"), "``");
    }
}
