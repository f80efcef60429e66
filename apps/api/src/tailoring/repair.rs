//! Response Parser & Repair — turns raw upstream text into a JSON object.
//!
//! Strict parse first. If that fails, one structural repair pass closes an
//! open string, appends missing closers in nesting order and drops trailing
//! commas, then parses again. Nothing is invented beyond those characters.

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::tailoring::error::TailorError;

/// Characters of raw output kept in logs and error previews.
const PREVIEW_CHARS: usize = 500;

/// Removes a leading ```json / ``` fence and a trailing ``` fence, then trims.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    for prefix in ["```json", "```JSON", "```"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parses upstream output into an object, repairing truncation once.
pub fn parse_response(raw: &str) -> Result<Map<String, Value>, TailorError> {
    let text = strip_code_fences(raw);

    let first_error = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => {
            return Err(malformed(
                format!("expected a JSON object, found {}", json_kind(&other)),
                raw,
            ))
        }
        Err(e) => e,
    };

    let repaired = repair_truncated(text);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(map)) => {
            info!(
                original_error = %first_error,
                added_chars = repaired.len().saturating_sub(text.len()),
                "repaired truncated upstream JSON"
            );
            Ok(map)
        }
        Ok(other) => Err(malformed(
            format!("expected a JSON object, found {}", json_kind(&other)),
            raw,
        )),
        Err(second_error) => Err(malformed(
            format!("{first_error}; repair failed: {second_error}"),
            raw,
        )),
    }
}

/// Closes what a truncated generation left open.
///
/// Scans once, tracking string/escape state and a stack of open `{` / `[`
/// outside strings. Commas before a closer are dropped during the scan, so
/// string contents are never touched. An unterminated string is closed (a
/// dangling `\` is dropped first), then closers are appended innermost first.
pub fn repair_truncated(text: &str) -> String {
    let mut repaired = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut open: Vec<char> = Vec::new();

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            repaired.push(c);
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                drop_trailing_comma(&mut repaired);
                if open.last() == Some(&c) {
                    open.pop();
                }
            }
            _ => {}
        }
        repaired.push(c);
    }

    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    } else {
        // `{"a": 1,` cannot be closed as-is.
        drop_trailing_comma(&mut repaired);
    }

    repaired.extend(open.iter().rev());
    repaired
}

/// Removes a comma that is the last non-whitespace character. Only called
/// outside strings, so the comma is always structural.
fn drop_trailing_comma(text: &mut String) {
    let end = text.trim_end().len();
    if text[..end].ends_with(',') {
        text.truncate(end - 1);
    }
}

fn malformed(reason: String, raw: &str) -> TailorError {
    let preview: String = raw.chars().take(PREVIEW_CHARS).collect();
    error!(reason = %reason, raw_length = raw.len(), preview = %preview, "unparseable upstream response");
    TailorError::MalformedResponse {
        reason,
        raw: raw.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    crate::schema::coercion::kind_of(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```JSON\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n[]\n```  "), "[]");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_valid_object_parses_without_repair() {
        let map = parse_response(r#"{"summary": "ok", "skills": {"A": ["x"]}}"#).unwrap();
        assert_eq!(map["summary"], json!("ok"));
    }

    #[test]
    fn test_fenced_object_parses() {
        let map = parse_response("```json\n{\"summary\": \"ok\"}\n```").unwrap();
        assert_eq!(map["summary"], json!("ok"));
    }

    #[test]
    fn test_truncated_inside_string_is_closed() {
        let raw = r#"{"tailoredResume":{"summary":"Built APIs"#;
        assert_eq!(
            repair_truncated(raw),
            r#"{"tailoredResume":{"summary":"Built APIs"}}"#
        );
        let map = parse_response(raw).unwrap();
        assert_eq!(map["tailoredResume"]["summary"], json!("Built APIs"));
    }

    #[test]
    fn test_truncated_keyword_list_closes_string_then_list_then_object() {
        let raw = r#"{"tailoredResume":{"summary":"x"},"matchedKeywords":["Python"#;
        assert_eq!(repair_truncated(raw), format!("{raw}\"]}}"));
        let map = parse_response(raw).unwrap();
        assert_eq!(map["matchedKeywords"], json!(["Python"]));
    }

    #[test]
    fn test_closers_follow_nesting_order() {
        let raw = r#"{"experiences":[{"company":"Acme","description":["one","two"#;
        let map = parse_response(raw).unwrap();
        assert_eq!(
            map["experiences"][0]["description"],
            json!(["one", "two"])
        );
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let raw = r#"{"summary":"uses {braces} and [brackets","skills":["Rust""#;
        let map = parse_response(raw).unwrap();
        assert_eq!(map["summary"], json!("uses {braces} and [brackets"));
        assert_eq!(map["skills"], json!(["Rust"]));
    }

    #[test]
    fn test_trailing_commas_are_removed() {
        let map = parse_response(r#"{"skills": ["a", "b",], "summary": "x",}"#).unwrap();
        assert_eq!(map["skills"], json!(["a", "b"]));

        let map = parse_response(r#"{"skills": ["a", "b","#).unwrap();
        assert_eq!(map["skills"], json!(["a", "b"]));
    }

    #[test]
    fn test_comma_cleanup_leaves_string_contents_alone() {
        let raw = r#"{"summary": "a, ]", "skills": ["x","#;
        let map = parse_response(raw).unwrap();
        assert_eq!(map["summary"], json!("a, ]"));
        assert_eq!(map["skills"], json!(["x"]));

        let raw = r#"{"changes": ["kept ,} inside", "b",], "summary": "s""#;
        let map = parse_response(raw).unwrap();
        assert_eq!(map["changes"], json!(["kept ,} inside", "b"]));
    }

    #[test]
    fn test_dangling_escape_is_dropped() {
        let raw = "{\"summary\":\"quote \\";
        let map = parse_response(raw).unwrap();
        assert_eq!(map["summary"], json!("quote "));
    }

    #[test]
    fn test_unrepairable_text_is_malformed() {
        let err = parse_response("I'm sorry, I can't do that.").unwrap_err();
        match err {
            TailorError::MalformedResponse { raw, .. } => {
                assert_eq!(raw, "I'm sorry, I can't do that.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            parse_response("[1, 2, 3]"),
            Err(TailorError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_response("[1, 2"),
            Err(TailorError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_truncated_after_key_is_malformed() {
        // A missing value cannot be invented.
        assert!(matches!(
            parse_response(r#"{"summary":"#),
            Err(TailorError::MalformedResponse { .. })
        ));
    }
}
