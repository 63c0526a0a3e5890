use flowwatch_types::{EventRecord, FieldText, RenderedEntry, RenderedField};
use serde_json::Value;

/// Converts an event record into the entry stored in the run log.
///
/// Fields keep the order the server sent them in.
pub fn render_event(record: &EventRecord) -> RenderedEntry {
    RenderedEntry {
        qualified_name: record.qualified_name.clone(),
        fields: record
            .value
            .iter()
            .map(|(label, value)| RenderedField::new(label.clone(), render_value(value)))
            .collect(),
    }
}

/// Display text for one field value.
///
/// Strings are shown as-is, whitespace included. Other values use their
/// compact JSON text. Null and blank text become [`FieldText::NoData`].
pub fn render_value(value: &Value) -> FieldText {
    let text = match value {
        Value::Null => return FieldText::NoData,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        FieldText::NoData
    } else {
        FieldText::Value(text)
    }
}
