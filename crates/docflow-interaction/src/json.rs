//! Lenient JSON extraction for oracle responses.
//!
//! The oracle promises JSON but frequently delivers it wrapped in markdown
//! code fences, prefixed with a label, or buried inside prose. This module is
//! the single place that tolerance lives: everything downstream only ever
//! sees a well-typed value or `None`.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Prefixes the oracle is known to prepend to JSON payloads.
const FENCE_PREFIXES: &[&str] = &["```json", "```", "JSON:", "Output:", "응답:"];

/// Alias keys the oracle substitutes for the canonical ones.
const KEY_ALIASES: &[(&str, &[&str])] = &[
    ("filled_fields", &["filled", "채워진항목"]),
    ("missing_fields", &["missing", "누락"]),
    ("ask", &["questions", "questions_to_ask", "질문"]),
    ("doc_type", &["type", "문서유형"]),
];

/// Strips code-fence markers and known label prefixes.
pub fn strip_json_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    loop {
        let before = text;
        for prefix in FENCE_PREFIXES {
            if let Some(rest) = text.strip_prefix(prefix) {
                text = rest.trim_start();
                break;
            }
        }
        if text == before {
            break;
        }
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// Extracts the first `{...}` span from prose, if any.
pub fn extract_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Copies alias keys onto their canonical names, keeping originals.
fn normalize_aliases(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    for (canonical, aliases) in KEY_ALIASES {
        if map.contains_key(*canonical) {
            continue;
        }
        let aliased = aliases.iter().find_map(|alias| map.get(*alias).cloned());
        if let Some(aliased) = aliased {
            map.insert((*canonical).to_string(), aliased);
        }
    }
    Value::Object(map)
}

/// Attempts to decode `T` from a raw oracle response.
///
/// Tries, in order: the fence-stripped text as a whole, then the first
/// object span inside it. Alias keys are normalized before decoding.
/// Returns `None` when nothing parses; never errors.
pub fn parse_lenient<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let stripped = strip_json_fence(raw);

    let candidates = [Some(stripped), extract_object_span(stripped)];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            let value = normalize_aliases(value);
            if let Ok(parsed) = serde_json::from_value(value) {
                return Some(parsed);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::oracle::{ExtractionReport, FieldEdit};

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n{\"key\": \"금액\"}\n```";
        assert_eq!(strip_json_fence(raw), "{\"key\": \"금액\"}");
    }

    #[test]
    fn strips_label_prefixes() {
        assert_eq!(strip_json_fence("응답: {\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_json_fence("Output: {\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn extracts_object_buried_in_prose() {
        let raw = "수정 결과는 다음과 같습니다: {\"key\": \"금액\", \"value\": \"600000\"} 입니다.";
        let edit: FieldEdit = parse_lenient(raw).unwrap();
        assert_eq!(edit.key, "금액");
        assert_eq!(edit.value, "600000");
    }

    #[test]
    fn alias_keys_are_normalized() {
        let raw = r#"{"filled_fields": {"금액": "500000"}, "questions": [{"key": "사유", "question": "사유는요?"}]}"#;
        let report: ExtractionReport = parse_lenient(raw).unwrap();
        assert_eq!(report.filled_fields["금액"], "500000");
        assert_eq!(report.ask.len(), 1);
    }

    #[test]
    fn prose_without_json_yields_none() {
        assert!(parse_lenient::<FieldEdit>("죄송합니다, 잘 이해하지 못했습니다.").is_none());
    }

    #[test]
    fn partial_keys_fill_with_defaults() {
        let report: ExtractionReport = parse_lenient(r#"{"missing_fields": ["사유"]}"#).unwrap();
        assert!(report.filled_fields.is_empty());
        assert_eq!(report.missing_fields, ["사유"]);
        assert!(report.ask.is_empty());
    }

    #[test]
    fn fenced_and_labeled_payload_decodes() {
        let raw = "```json\n{\"key\": \"승인자\", \"value\": \"김이준\"}\n```";
        let edit: FieldEdit = parse_lenient(raw).unwrap();
        assert_eq!(edit.key, "승인자");
    }
}
