//! Event records parsed from a run's stream and the rendered entries derived from them.
//!
//! An [`EventRecord`] is what the server sent on one NDJSON line. A
//! [`RenderedEntry`] is the display-ready form kept in the run log; it is
//! plain structured data and carries no markup.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Marker displayed for fields whose value is null, empty or whitespace only.
pub const NO_DATA_MARKER: &str = "No data";

/// One event from a run's stream: `{"qualified_name": ..., "value": {...}}`.
///
/// Both fields are optional on the wire. A missing or non-object `value`
/// yields an empty mapping; a non-string `qualified_name` is kept as its JSON
/// text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, deserialize_with = "lenient_name")]
    pub qualified_name: Option<String>,
    /// Field name to arbitrary JSON value, in the order the server sent them.
    #[serde(default, deserialize_with = "lenient_mapping")]
    pub value: IndexMap<String, JsonValue>,
}

impl EventRecord {
    pub fn new(qualified_name: impl Into<String>, value: IndexMap<String, JsonValue>) -> Self {
        Self {
            qualified_name: Some(qualified_name.into()),
            value,
        }
    }
}

fn lenient_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(name)) => Some(name),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_mapping<'de, D>(deserializer: D) -> Result<IndexMap<String, JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawValue {
        Mapping(IndexMap<String, JsonValue>),
        Other(JsonValue),
    }

    Ok(match RawValue::deserialize(deserializer)? {
        RawValue::Mapping(mapping) => mapping,
        RawValue::Other(_) => IndexMap::new(),
    })
}

/// Display text of one rendered field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum FieldText {
    /// The value was null, empty or whitespace only.
    NoData,
    /// Textual form of the value, whitespace and line breaks preserved.
    Value(String),
}

impl FieldText {
    /// Text to show for this field; [`NO_DATA_MARKER`] for empty values.
    pub fn display(&self) -> &str {
        match self {
            Self::NoData => NO_DATA_MARKER,
            Self::Value(text) => text,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// A field label paired with its display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedField {
    pub label: String,
    pub text: FieldText,
}

impl RenderedField {
    pub fn new(label: impl Into<String>, text: FieldText) -> Self {
        Self {
            label: label.into(),
            text,
        }
    }
}

/// Display-ready representation of one event, stored verbatim in the run log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEntry {
    #[serde(default)]
    pub qualified_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<RenderedField>,
}

impl RenderedEntry {
    /// Looks up the display text of a field by label.
    pub fn field(&self, label: &str) -> Option<&FieldText> {
        self.fields.iter().find(|field| field.label == label).map(|field| &field.text)
    }

    /// Name shown in the entry header; empty when the server omitted it.
    pub fn title(&self) -> &str {
        self.qualified_name.as_deref().unwrap_or_default()
    }
}
