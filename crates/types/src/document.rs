//! Configuration document types
//!
//! A document lives in two shapes: [`RawDocument`] is whatever JSON object is
//! on disk (possibly hand-edited, possibly carrying fields this version does
//! not know), and [`ConfigDocument`] is the typed form produced by schema
//! validation. Unknown fields ride along in [`ConfigDocument::extra`] so that
//! a write never drops them.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Untyped JSON object form of a configuration document
pub type RawDocument = Map<String, Value>;

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "azure_openai")]
    AzureOpenAi,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "coze")]
    Coze,
}

impl LlmProvider {
    pub const ALL: [LlmProvider; 4] = [
        LlmProvider::OpenAi,
        LlmProvider::AzureOpenAi,
        LlmProvider::Ollama,
        LlmProvider::Coze,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::AzureOpenAi => "azure_openai",
            LlmProvider::Ollama => "ollama",
            LlmProvider::Coze => "coze",
        }
    }

    /// Wire names of every provider, in declaration order
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.as_str()).collect()
    }
}

impl Default for LlmProvider {
    fn default() -> Self {
        LlmProvider::OpenAi
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown LLM provider '{}'", s))
    }
}

/// Validated configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Provider API key (sensitive)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub llm_provider: LlmProvider,
    #[serde(default)]
    pub telemetry_enabled: bool,
    #[serde(default = "default_true")]
    pub discovery_enabled: bool,
    /// Origins allowed to call the backend, in the order they were added
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub coze_voice_id: Option<String>,
    #[serde(default)]
    pub coze_workspace_id: Option<String>,
    /// Fields not recognized by this version, preserved verbatim
    #[serde(flatten)]
    pub extra: RawDocument,
}

fn default_true() -> bool {
    true
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            api_key: None,
            llm_provider: LlmProvider::default(),
            telemetry_enabled: false,
            discovery_enabled: default_true(),
            allowed_origins: Vec::new(),
            notes: String::new(),
            coze_voice_id: None,
            coze_workspace_id: None,
            extra: RawDocument::new(),
        }
    }
}

impl ConfigDocument {
    /// Flatten into the on-disk object shape, known fields winning over extras
    pub fn to_raw(&self) -> RawDocument {
        let mut raw = self.extra.clone();
        raw.insert("api_key".to_string(), json!(self.api_key));
        raw.insert("llm_provider".to_string(), json!(self.llm_provider.as_str()));
        raw.insert("telemetry_enabled".to_string(), json!(self.telemetry_enabled));
        raw.insert("discovery_enabled".to_string(), json!(self.discovery_enabled));
        raw.insert("allowed_origins".to_string(), json!(self.allowed_origins));
        raw.insert("notes".to_string(), json!(self.notes));
        raw.insert("coze_voice_id".to_string(), json!(self.coze_voice_id));
        raw.insert("coze_workspace_id".to_string(), json!(self.coze_workspace_id));
        raw
    }
}

/// A partial update
///
/// Every key present replaces the stored key of the same name, an explicit
/// `null` clears a nullable field, and keys that are absent stay untouched.
/// Keys outside the schema are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigPatch(RawDocument);

impl ConfigPatch {
    pub fn new() -> Self {
        Self(RawDocument::new())
    }

    /// Build a patch from an arbitrary request body, which must be an object
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ValidationError::single(
                "body",
                &format!("patch must be a JSON object, got {}", json_type_name(&other)),
            )),
        }
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn clear(mut self, key: &str) -> Self {
        self.0.insert(key.to_string(), Value::Null);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow overlay onto `doc`
    pub fn apply_to(&self, doc: &mut RawDocument) {
        for (key, value) in &self.0 {
            doc.insert(key.clone(), value.clone());
        }
    }
}

impl From<RawDocument> for ConfigPatch {
    fn from(map: RawDocument) -> Self {
        Self(map)
    }
}

/// Human-readable JSON type name for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
