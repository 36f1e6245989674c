//! Record parsing: normalised text → `ExtractionResult`, or a tagged failure.
//!
//! The model is an untrusted producer. Its text is parsed, never assumed:
//! anything that is not a JSON array of objects becomes a
//! [`MalformedExtraction`] carrying the raw response. No partial recovery is
//! attempted — a truncated array fails as a whole.
//!
//! Field content is kept as text. Strings pass through unchanged, `null`
//! stays null, other scalars keep their JSON spelling (`26` → `"26"`), and a
//! nested value is kept as compact JSON so nothing the model wrote is lost.
//! Keys are not checked against the schema here.

use crate::error::MalformedExtraction;
use crate::record::{ExtractionResult, Record};
use serde_json::Value;
use tracing::debug;

/// Parse `candidate` (normalised text) into records.
///
/// `raw` is the unnormalised response, attached to the failure for display.
pub fn parse_records(candidate: &str, raw: &str) -> Result<ExtractionResult, MalformedExtraction> {
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| MalformedExtraction::new(format!("invalid JSON: {e}"), raw))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(MalformedExtraction::new(
                format!("expected a JSON array of rows, found {}", kind(&other)),
                raw,
            ))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => records.push(
                map.into_iter()
                    .map(|(k, v)| (k, cell_text(v)))
                    .collect::<Record>(),
            ),
            other => {
                return Err(MalformedExtraction::new(
                    format!("row {} is {}, not an object", i + 1, kind(&other)),
                    raw,
                ))
            }
        }
    }

    debug!("Parsed {} records", records.len());
    Ok(ExtractionResult::new(records))
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Some(nested.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<ExtractionResult, MalformedExtraction> {
        parse_records(s, s)
    }

    #[test]
    fn parses_rows_in_order() {
        let r = parse(r#"[{"stt":"1","ten_nv":"A"},{"stt":"2","ten_nv":"B"}]"#).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.records()[0].value("ten_nv"), Some("A"));
        assert_eq!(r.records()[1].value("stt"), Some("2"));
    }

    #[test]
    fn keeps_key_order_and_nulls() {
        let r = parse(r#"[{"tong":"26","stt":"1","ngay_1":null}]"#).unwrap();
        let keys: Vec<&str> = r.records()[0].keys().collect();
        assert_eq!(keys, ["tong", "stt", "ngay_1"]);
        assert!(r.records()[0].contains_key("ngay_1"));
        assert_eq!(r.records()[0].value("ngay_1"), None);
    }

    #[test]
    fn non_string_scalars_keep_json_spelling() {
        let r = parse(r#"[{"tong":26,"ngay_1":8.5,"x":true,"y":["P","X"]}]"#).unwrap();
        let rec = &r.records()[0];
        assert_eq!(rec.value("tong"), Some("26"));
        assert_eq!(rec.value("ngay_1"), Some("8.5"));
        assert_eq!(rec.value("x"), Some("true"));
        assert_eq!(rec.value("y"), Some(r#"["P","X"]"#));
    }

    #[test]
    fn marks_are_verbatim() {
        let r = parse(r#"[{"ngay_1":"KP","ngay_2":"x","ngay_3":"08"}]"#).unwrap();
        let rec = &r.records()[0];
        assert_eq!(rec.value("ngay_1"), Some("KP"));
        assert_eq!(rec.value("ngay_2"), Some("x"));
        assert_eq!(rec.value("ngay_3"), Some("08"));
    }

    #[test]
    fn empty_array_is_empty_result() {
        assert!(parse("[]").unwrap().is_empty());
    }

    #[test]
    fn truncated_json_is_malformed() {
        let err = parse(r#"[{"stt":"1""#).unwrap_err();
        assert!(err.detail.starts_with("invalid JSON"), "got: {}", err.detail);
        assert_eq!(err.raw, r#"[{"stt":"1""#);
    }

    #[test]
    fn top_level_object_is_malformed() {
        let err = parse(r#"{"stt":"1"}"#).unwrap_err();
        assert!(err.detail.contains("an object"), "got: {}", err.detail);
    }

    #[test]
    fn scalar_row_is_malformed() {
        let err = parse(r#"[{"stt":"1"}, "oops"]"#).unwrap_err();
        assert!(err.detail.contains("row 2"), "got: {}", err.detail);
    }

    #[test]
    fn raw_text_is_attached_not_candidate() {
        let err = parse_records("Error: timeout", "  Error: timeout\n").unwrap_err();
        assert_eq!(err.raw, "  Error: timeout\n");
    }
}
