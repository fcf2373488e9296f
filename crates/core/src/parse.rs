//! Extraction of the single JSON object a structured prompt asks for.
//!
//! Models are told to reply with JSON only, but in practice replies arrive
//! fenced, bare, or wrapped in stray prose. The helpers here accept all three
//! and leave strictness to the serde shape checks downstream.

use crate::error::SchemaViolation;
use serde::de::DeserializeOwned;

/// Pulls the JSON payload out of a raw completion.
///
/// A fenced ```json block wins when present; otherwise the first
/// brace-balanced object in the text is taken. Returns `None` when the reply
/// contains no object at all, which callers treat as "the model chose prose".
pub fn extract_json_object(raw: &str) -> Option<String> {
    if let Some(start) = raw.find("```json") {
        let body = &raw[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            let candidate = body[..end].trim();
            if !candidate.is_empty() {
                return Some(candidate.to_string());
            }
        }
    }
    balanced_object(raw).map(str::to_string)
}

/// Finds the first `{ ... }` span with balanced braces, ignoring braces that
/// appear inside string literals.
fn balanced_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts and deserializes the JSON payload into `T`.
///
/// Both "no JSON present" and "JSON of the wrong shape" surface as a
/// [`SchemaViolation`] so callers have a single failure path to retry on.
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, SchemaViolation> {
    let json = extract_json_object(raw).ok_or_else(|| {
        SchemaViolation::new(format!(
            "reply contained no JSON object: {}",
            snippet(raw)
        ))
    })?;
    serde_json::from_str(&json)
        .map_err(|e| SchemaViolation::new(format!("reply failed to deserialize: {}", e)))
}

/// Truncates raw model output for error messages.
fn snippet(raw: &str) -> &str {
    let end = raw
        .char_indices()
        .nth(120)
        .map(|(idx, _)| idx)
        .unwrap_or(raw.len());
    raw[..end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Flag {
        ok: bool,
    }

    #[test]
    fn test_extract_fenced_block() {
        let raw = "Here you go:\n```json\n{\"ok\": true}\n```\nDone.";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"ok\": true}");
    }

    #[test]
    fn test_extract_bare_object() {
        let raw = "{\"ok\": false}";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"ok\": false}");
    }

    #[test]
    fn test_extract_object_surrounded_by_prose() {
        let raw = "Sure! {\"ok\": true} Hope that helps.";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"ok\": true}");
    }

    #[test]
    fn test_extract_nested_object() {
        let raw = "{\"outer\": {\"inner\": 1}}";
        assert_eq!(extract_json_object(raw).unwrap(), raw);
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_the_scanner() {
        let raw = "{\"text\": \"a } inside\"}";
        assert_eq!(extract_json_object(raw).unwrap(), raw);
    }

    #[test]
    fn test_no_object_returns_none() {
        assert!(extract_json_object("Could you tell me more about that?").is_none());
    }

    #[test]
    fn test_parse_payload_success() {
        let flag: Flag = parse_payload("```json\n{\"ok\": true}\n```").unwrap();
        assert_eq!(flag, Flag { ok: true });
    }

    #[test]
    fn test_parse_payload_missing_json() {
        let err = parse_payload::<Flag>("hello there").unwrap_err();
        assert!(err.0.contains("no JSON object"));
    }

    #[test]
    fn test_parse_payload_wrong_shape() {
        let err = parse_payload::<Flag>("{\"ok\": \"not a bool\"}").unwrap_err();
        assert!(err.0.contains("deserialize"));
    }
}
