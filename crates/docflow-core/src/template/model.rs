//! Template domain model.
//!
//! Templates are authored externally and arrive with a loosely shaped
//! `fields` declaration: historically either a bare list of field keys or a
//! mapping that carries a curated `required` list. `FieldSpec` normalizes that
//! shape once, at the deserialization boundary, so the rest of the code only
//! ever sees an ordered list of field keys.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The field declaration of a template, normalized into a sum type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSpec {
    /// A bare ordered list of field keys.
    Plain(Vec<String>),
    /// A curated `required` subset pulled out of a field mapping.
    ///
    /// This is the set that gates the confirm stage; keys outside it may
    /// still appear in a filled-field map and are kept as-is.
    Curated(Vec<String>),
    /// No usable field declaration.
    ///
    /// Not an error: a template without fields fast-forwards the compose
    /// flow straight to the confirm stage.
    #[default]
    Absent,
}

impl FieldSpec {
    /// Returns the ordered list of field keys this spec requires.
    pub fn keys(&self) -> &[String] {
        match self {
            Self::Plain(keys) | Self::Curated(keys) => keys,
            Self::Absent => &[],
        }
    }

    /// Returns true if this spec requires no fields at all.
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl Serialize for FieldSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Plain(keys) => keys.serialize(serializer),
            Self::Curated(keys) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("required", keys)?;
                map.end()
            }
            Self::Absent => serializer.serialize_none(),
        }
    }
}

impl FieldSpec {
    /// Normalizes an arbitrary JSON value into a `FieldSpec`.
    ///
    /// - list -> `Plain`, entries stringified, order preserved
    /// - mapping with a `required` list -> `Curated` with that list verbatim
    /// - mapping without `required` -> `Plain` over the mapping's keys, in
    ///   their original iteration order
    /// - anything else (null, number, string, ...) -> `Absent`
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                Self::Plain(items.iter().map(stringify).collect())
            }
            serde_json::Value::Object(map) => {
                if let Some(serde_json::Value::Array(required)) = map.get("required") {
                    return Self::Curated(required.iter().map(stringify).collect());
                }
                Self::Plain(map.keys().cloned().collect())
            }
            _ => Self::Absent,
        }
    }
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A named document schema.
///
/// Immutable once loaded; the compose session holds a read-only copy for the
/// duration of one interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Unique document type identifier (e.g. "품의", "연차 신청").
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Required field declaration, normalized at the boundary.
    #[serde(default)]
    pub fields: FieldSpec,
    /// Free-text authoring guidance shown on request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide_md: Option<String>,
}

impl Template {
    /// Creates a template with a plain ordered field list.
    pub fn new(doc_type: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            fields: FieldSpec::Plain(fields),
            guide_md: None,
        }
    }

    /// The ordered list of field keys the confirm gate checks.
    pub fn resolved_fields(&self) -> &[String] {
        self.fields.keys()
    }

    /// Field keys not yet present in `filled`, in declaration order.
    pub fn unfilled_fields(&self, filled: &HashMap<String, String>) -> Vec<String> {
        self.resolved_fields()
            .iter()
            .filter(|key| !filled.contains_key(*key))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> FieldSpec {
        FieldSpec::from_value(&value)
    }

    #[test]
    fn list_fields_preserve_order() {
        let spec = spec(json!(["금액", "사유", "기한"]));
        assert_eq!(spec.keys(), ["금액", "사유", "기한"]);
    }

    #[test]
    fn list_fields_stringify_non_strings() {
        let spec = spec(json!(["금액", 42]));
        assert_eq!(spec.keys(), ["금액", "42"]);
    }

    #[test]
    fn required_list_takes_precedence_over_other_keys() {
        let spec = spec(json!({
            "required": ["금액", "사유"],
            "optional": ["비고"],
        }));
        assert_eq!(spec, FieldSpec::Curated(vec!["금액".into(), "사유".into()]));
    }

    #[test]
    fn mapping_without_required_uses_its_keys_in_order() {
        let spec = spec(json!({"기한": "날짜", "승인선": "이름"}));
        assert_eq!(spec.keys(), ["기한", "승인선"]);
    }

    #[test]
    fn required_key_with_non_list_value_falls_back_to_map_keys() {
        let spec = spec(json!({"required": "금액", "사유": true}));
        assert_eq!(spec.keys(), ["required", "사유"]);
    }

    #[test]
    fn null_and_scalar_shapes_resolve_to_empty() {
        assert!(spec(json!(null)).is_empty());
        assert!(spec(json!("금액")).is_empty());
        assert!(spec(json!(7)).is_empty());
    }

    #[test]
    fn empty_required_list_is_empty_but_curated() {
        let spec = spec(json!({"required": []}));
        assert_eq!(spec, FieldSpec::Curated(vec![]));
        assert!(spec.is_empty());
    }

    #[test]
    fn template_deserializes_with_loose_fields() {
        let template: Template = serde_json::from_value(json!({
            "type": "품의",
            "fields": {"required": ["금액", "사유"]},
            "guide_md": "금액은 숫자로 적어주세요.",
        }))
        .unwrap();

        assert_eq!(template.doc_type, "품의");
        assert_eq!(template.resolved_fields(), ["금액", "사유"]);
        assert!(template.guide_md.is_some());
    }

    #[test]
    fn template_without_fields_resolves_empty() {
        let template: Template =
            serde_json::from_value(json!({"type": "간단 보고"})).unwrap();
        assert!(template.resolved_fields().is_empty());
    }

    #[test]
    fn unfilled_fields_follow_declaration_order() {
        let template = Template::new("품의", vec!["금액".into(), "사유".into(), "기한".into()]);
        let mut filled = HashMap::new();
        filled.insert("사유".to_string(), "장비 노후화".to_string());

        assert_eq!(template.unfilled_fields(&filled), ["금액", "기한"]);
    }
}
