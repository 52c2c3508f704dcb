//! Field schema, validation and secret masking

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use types::utils::normalize_origin;
use types::{json_type_name, ConfigDocument, LlmProvider, RawDocument, ValidationError};

/// Replacement shown for a non-empty sensitive value
pub const MASK: &str = "***";

const MAX_SECRET_LEN: usize = 1024;
const MAX_ID_LEN: usize = 256;
const MAX_NOTES_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    OptionalText,
    Boolean,
    OriginList,
    Provider,
}

/// Static description of one recognized field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub sensitive: bool,
    pub max_len: Option<usize>,
}

static FIELDS: [FieldSpec; 8] = [
    FieldSpec {
        name: "api_key",
        kind: FieldKind::OptionalText,
        description: "API key for the selected LLM provider",
        sensitive: true,
        max_len: Some(MAX_SECRET_LEN),
    },
    FieldSpec {
        name: "llm_provider",
        kind: FieldKind::Provider,
        description: "LLM backend used for chat, audio and image requests",
        sensitive: false,
        max_len: None,
    },
    FieldSpec {
        name: "telemetry_enabled",
        kind: FieldKind::Boolean,
        description: "Send anonymous usage telemetry",
        sensitive: false,
        max_len: None,
    },
    FieldSpec {
        name: "discovery_enabled",
        kind: FieldKind::Boolean,
        description: "Advertise the device on the local network",
        sensitive: false,
        max_len: None,
    },
    FieldSpec {
        name: "allowed_origins",
        kind: FieldKind::OriginList,
        description: "Browser origins allowed to call the backend",
        sensitive: false,
        max_len: None,
    },
    FieldSpec {
        name: "notes",
        kind: FieldKind::Text,
        description: "Free-form operator notes",
        sensitive: false,
        max_len: Some(MAX_NOTES_LEN),
    },
    FieldSpec {
        name: "coze_voice_id",
        kind: FieldKind::OptionalText,
        description: "Voice used for Coze text-to-speech",
        sensitive: false,
        max_len: Some(MAX_ID_LEN),
    },
    FieldSpec {
        name: "coze_workspace_id",
        kind: FieldKind::OptionalText,
        description: "Coze workspace that owns the bots",
        sensitive: false,
        max_len: Some(MAX_ID_LEN),
    },
];

pub fn fields() -> &'static [FieldSpec] {
    &FIELDS
}

pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

pub fn sensitive_fields() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().filter(|f| f.sensitive).map(|f| f.name)
}

/// The document written on first run and on reset
pub fn default_document() -> RawDocument {
    ConfigDocument::default().to_raw()
}

/// Check every field of `raw` and build the typed document
///
/// All violations are collected before returning. Recognized fields that are
/// absent take their defaults; unrecognized fields are carried over.
pub fn validate(raw: &RawDocument) -> Result<ConfigDocument, ValidationError> {
    let mut doc = ConfigDocument::default();
    let mut errors = ValidationError::new();

    for (key, value) in raw {
        let spec = match field(key) {
            Some(spec) => spec,
            None => {
                doc.extra.insert(key.clone(), value.clone());
                continue;
            }
        };

        match spec.name {
            "api_key" => doc.api_key = optional_text(spec, value, &mut errors),
            "coze_voice_id" => doc.coze_voice_id = optional_text(spec, value, &mut errors),
            "coze_workspace_id" => doc.coze_workspace_id = optional_text(spec, value, &mut errors),
            "notes" => {
                if let Some(notes) = text(spec, value, &mut errors) {
                    doc.notes = notes;
                }
            }
            "telemetry_enabled" => {
                if let Some(flag) = boolean(spec, value, &mut errors) {
                    doc.telemetry_enabled = flag;
                }
            }
            "discovery_enabled" => {
                if let Some(flag) = boolean(spec, value, &mut errors) {
                    doc.discovery_enabled = flag;
                }
            }
            "llm_provider" => {
                if let Some(provider) = provider(spec, value, &mut errors) {
                    doc.llm_provider = provider;
                }
            }
            "allowed_origins" => {
                if let Some(origins) = origin_list(spec, value, &mut errors) {
                    doc.allowed_origins = origins;
                }
            }
            other => errors.add(other, "recognized field has no validator"),
        }
    }

    errors.into_result()?;
    Ok(doc)
}

fn check_len(spec: &FieldSpec, s: &str, errors: &mut ValidationError) -> bool {
    match spec.max_len {
        Some(max) if s.chars().count() > max => {
            errors.add(spec.name, &format!("must be at most {} characters", max));
            false
        }
        _ => true,
    }
}

fn text(spec: &FieldSpec, value: &Value, errors: &mut ValidationError) -> Option<String> {
    match value {
        Value::String(s) if check_len(spec, s, errors) => Some(s.clone()),
        Value::String(_) => None,
        other => {
            errors.add(spec.name, &format!("expected a string, got {}", json_type_name(other)));
            None
        }
    }
}

fn optional_text(spec: &FieldSpec, value: &Value, errors: &mut ValidationError) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if check_len(spec, s, errors) => Some(s.clone()),
        Value::String(_) => None,
        other => {
            errors.add(
                spec.name,
                &format!("expected a string or null, got {}", json_type_name(other)),
            );
            None
        }
    }
}

fn boolean(spec: &FieldSpec, value: &Value, errors: &mut ValidationError) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        other => {
            errors.add(spec.name, &format!("expected a boolean, got {}", json_type_name(other)));
            None
        }
    }
}

fn provider(spec: &FieldSpec, value: &Value, errors: &mut ValidationError) -> Option<LlmProvider> {
    let name = match value {
        Value::String(s) => s,
        other => {
            errors.add(spec.name, &format!("expected a string, got {}", json_type_name(other)));
            return None;
        }
    };

    match name.parse::<LlmProvider>() {
        Ok(provider) => Some(provider),
        Err(reason) => {
            errors.add(
                spec.name,
                &format!("{}; expected one of {:?}", reason, LlmProvider::names()),
            );
            None
        }
    }
}

fn origin_list(spec: &FieldSpec, value: &Value, errors: &mut ValidationError) -> Option<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            errors.add(
                spec.name,
                &format!("expected an array of origins, got {}", json_type_name(other)),
            );
            return None;
        }
    };

    let mut origins = Vec::with_capacity(items.len());
    let mut seen = HashSet::new();
    let before = errors.issues.len();

    for (i, item) in items.iter().enumerate() {
        let item_field = format!("{}[{}]", spec.name, i);
        let origin = match item {
            Value::String(s) => s,
            other => {
                errors.add(&item_field, &format!("expected a string, got {}", json_type_name(other)));
                continue;
            }
        };

        match normalize_origin(origin) {
            Err(reason) => errors.add(&item_field, &reason),
            Ok(canonical) => {
                if seen.insert(canonical) {
                    origins.push(origin.clone());
                } else {
                    errors.add(&item_field, &format!("duplicate origin '{}'", origin));
                }
            }
        }
    }

    (errors.issues.len() == before).then_some(origins)
}

/// Project `raw` for display, hiding sensitive values unless asked not to
///
/// A non-empty secret becomes [`MASK`]; an empty or null secret is left as it
/// is and an absent one stays absent, so only "set" vs "not set" leaks.
pub fn mask(raw: &RawDocument, include_secrets: bool) -> RawDocument {
    let mut projected = raw.clone();
    if include_secrets {
        return projected;
    }

    for name in sensitive_fields() {
        if let Some(value) = projected.get_mut(name) {
            let is_set = match value {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            };
            if is_set {
                *value = Value::String(MASK.to_string());
            }
        }
    }

    projected
}

/// Swap masked placeholders in `candidate` back to the stored secrets
///
/// Clients that read a masked document and send it back unchanged must not
/// overwrite the real secret with the placeholder.
pub fn restore_masked_secrets(candidate: &mut RawDocument, current: &RawDocument) {
    for name in sensitive_fields() {
        if candidate.get(name).and_then(Value::as_str) != Some(MASK) {
            continue;
        }
        match current.get(name) {
            Some(stored) => {
                candidate.insert(name.to_string(), stored.clone());
            }
            None => {
                candidate.remove(name);
            }
        }
    }
}

/// Machine-readable description of the document, shaped like JSON Schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDescriptor {
    pub title: &'static str,
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: BTreeMap<&'static str, PropertyDescriptor>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    #[serde(rename = "type")]
    pub json_type: Value,
    pub description: &'static str,
    pub default: Value,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(rename = "x-sensitive")]
    pub sensitive: bool,
}

/// Describe every recognized field with its type, default and sensitivity
pub fn schema() -> SchemaDescriptor {
    let defaults = default_document();

    let properties = FIELDS
        .iter()
        .map(|spec| {
            let (json_type, enum_values, items) = match spec.kind {
                FieldKind::Text => (json!("string"), None, None),
                FieldKind::OptionalText => (json!(["string", "null"]), None, None),
                FieldKind::Boolean => (json!("boolean"), None, None),
                FieldKind::Provider => (json!("string"), Some(LlmProvider::names()), None),
                FieldKind::OriginList => (
                    json!("array"),
                    None,
                    Some(json!({"type": "string", "format": "origin"})),
                ),
            };

            let descriptor = PropertyDescriptor {
                json_type,
                description: spec.description,
                default: defaults.get(spec.name).cloned().unwrap_or(Value::Null),
                enum_values,
                items,
                max_length: spec.max_len,
                sensitive: spec.sensitive,
            };
            (spec.name, descriptor)
        })
        .collect();

    SchemaDescriptor {
        title: "Turbopi local configuration",
        schema_type: "object",
        properties,
        additional_properties: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: Value) -> RawDocument {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_validate() {
        let doc = validate(&default_document()).unwrap();
        assert_eq!(doc, ConfigDocument::default());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let doc = validate(&raw(json!({"llm_provider": "coze"}))).unwrap();
        assert_eq!(doc.llm_provider, LlmProvider::Coze);
        assert!(doc.discovery_enabled);
        assert!(doc.allowed_origins.is_empty());
    }

    #[test]
    fn test_unknown_provider_is_rejected_by_name() {
        let err = validate(&raw(json!({"llm_provider": "not_a_real_provider"}))).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "llm_provider");
        assert!(err.issues[0].message.contains("not_a_real_provider"));
        assert!(err.issues[0].message.contains("azure_openai"));
    }

    #[test]
    fn test_every_violation_is_reported() {
        let err = validate(&raw(json!({
            "llm_provider": 7,
            "telemetry_enabled": "yes",
            "discovery_enabled": null,
            "allowed_origins": ["https://ok.example", "not an origin", 5, "https://ok.example"],
            "notes": false,
            "api_key": ["k"],
            "coze_workspace_id": "w".repeat(MAX_ID_LEN + 1),
        })))
        .unwrap_err();

        for field in [
            "llm_provider",
            "telemetry_enabled",
            "discovery_enabled",
            "allowed_origins[1]",
            "allowed_origins[2]",
            "allowed_origins[3]",
            "notes",
            "api_key",
            "coze_workspace_id",
        ] {
            assert!(err.has_field(field), "missing issue for {}: {}", field, err);
        }
        assert!(!err.has_field("allowed_origins[0]"));
    }

    #[test]
    fn test_origins_differing_only_in_case_are_duplicates() {
        let err = validate(&raw(json!({
            "allowed_origins": ["http://A.com", "http://a.com"]
        })))
        .unwrap_err();
        assert!(err.has_field("allowed_origins[1]"));
        assert!(!err.has_field("allowed_origins[0]"));

        let doc = validate(&raw(json!({"allowed_origins": ["http://Pi.Local:8000"]}))).unwrap();
        assert_eq!(doc.allowed_origins, vec!["http://Pi.Local:8000".to_string()]);
    }

    #[test]
    fn test_origin_with_dot_segment_is_rejected() {
        let err = validate(&raw(json!({
            "allowed_origins": ["http://example.com/..", "https://example.com/%2e"]
        })))
        .unwrap_err();
        assert!(err.has_field("allowed_origins[0]"));
        assert!(err.has_field("allowed_origins[1]"));
    }

    #[test]
    fn test_every_recognized_field_is_validated() {
        for spec in fields() {
            let value = match spec.kind {
                FieldKind::Text | FieldKind::OptionalText => json!("x"),
                FieldKind::Boolean => json!(!spec.name.starts_with("discovery")),
                FieldKind::OriginList => json!(["http://localhost:5173"]),
                FieldKind::Provider => json!("coze"),
            };
            let mut single = RawDocument::new();
            single.insert(spec.name.to_string(), value.clone());

            let doc = validate(&single)
                .unwrap_or_else(|e| panic!("{} failed validation: {}", spec.name, e));
            assert!(!doc.extra.contains_key(spec.name), "{} fell through to extra", spec.name);
            assert_eq!(doc.to_raw()[spec.name], value, "{} was not applied", spec.name);
        }
    }

    #[test]
    fn test_origins_must_be_an_array() {
        let err = validate(&raw(json!({"allowed_origins": "http://localhost"}))).unwrap_err();
        assert!(err.has_field("allowed_origins"));
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let doc = validate(&raw(json!({"a": 1, "nested": {"b": [2]}}))).unwrap();
        assert_eq!(doc.extra["a"], json!(1));
        assert_eq!(doc.to_raw()["nested"], json!({"b": [2]}));
    }

    #[test]
    fn test_null_clears_optional_text() {
        let doc = validate(&raw(json!({"coze_voice_id": null, "api_key": null}))).unwrap();
        assert!(doc.coze_voice_id.is_none());
        assert!(doc.api_key.is_none());
    }

    #[test]
    fn test_mask_hides_set_secret() {
        let doc = raw(json!({"api_key": "sk-live-123", "llm_provider": "openai"}));

        assert_eq!(mask(&doc, false)["api_key"], json!(MASK));
        assert_eq!(mask(&doc, false)["llm_provider"], json!("openai"));
        assert_eq!(mask(&doc, true)["api_key"], json!("sk-live-123"));
    }

    #[test]
    fn test_mask_leaves_unset_secret_alone() {
        let empty = raw(json!({"api_key": ""}));
        assert_eq!(mask(&empty, false)["api_key"], json!(""));
        assert_eq!(mask(&empty, true)["api_key"], json!(""));

        let null = raw(json!({"api_key": null}));
        assert_eq!(mask(&null, false)["api_key"], Value::Null);

        let absent = raw(json!({"notes": "x"}));
        assert!(!mask(&absent, false).contains_key("api_key"));
        assert!(!mask(&absent, true).contains_key("api_key"));
    }

    #[test]
    fn test_restore_masked_secret_keeps_stored_value() {
        let current = raw(json!({"api_key": "sk-real"}));

        let mut echoed = raw(json!({"api_key": MASK, "notes": "n"}));
        restore_masked_secrets(&mut echoed, &current);
        assert_eq!(echoed["api_key"], json!("sk-real"));

        let mut replaced = raw(json!({"api_key": "sk-new"}));
        restore_masked_secrets(&mut replaced, &current);
        assert_eq!(replaced["api_key"], json!("sk-new"));

        let mut nothing_stored = raw(json!({"api_key": MASK}));
        restore_masked_secrets(&mut nothing_stored, &RawDocument::new());
        assert!(!nothing_stored.contains_key("api_key"));
    }

    #[test]
    fn test_schema_describes_every_field() {
        let schema = schema();
        assert_eq!(schema.properties.len(), fields().len());

        let api_key = &schema.properties["api_key"];
        assert!(api_key.sensitive);
        assert_eq!(api_key.default, Value::Null);

        let provider = &schema.properties["llm_provider"];
        assert_eq!(provider.default, json!("openai"));
        assert_eq!(provider.enum_values.as_ref().map(|v| v.len()), Some(4));

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], json!("object"));
        assert_eq!(value["properties"]["discovery_enabled"]["default"], json!(true));
        assert_eq!(value["properties"]["api_key"]["x-sensitive"], json!(true));
        assert!(value["properties"]["notes"].get("enum").is_none());
    }
}
