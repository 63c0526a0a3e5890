//! HTML rendering of run log entries.
//!
//! Event names and values come straight from the workflow server, so every
//! piece of text is escaped here and nowhere else. Callers hand over
//! structured [`RenderedEntry`] values and receive markup safe to insert
//! into a page.

use std::fmt::Write;

use flowwatch_types::{FieldText, RenderedEntry};
use html_escape::encode_text;

/// Renders one log entry as an HTML block.
///
/// ```rust
/// use flowwatch_types::{FieldText, RenderedEntry, RenderedField};
/// use flowwatch_util::markup::render_entry_html;
///
/// let entry = RenderedEntry {
///     qualified_name: Some("StepDone".into()),
///     fields: vec![RenderedField::new("msg", FieldText::Value("ok".into()))],
/// };
/// let html = render_entry_html(&entry);
/// assert!(html.contains(r#"<span class="event-label">msg</span>"#));
/// ```
pub fn render_entry_html(entry: &RenderedEntry) -> String {
    let mut html = String::from("<div class=\"event\">");
    if let Some(name) = entry.qualified_name.as_deref() {
        let _ = write!(html, "<div class=\"event-name\">{}</div>", encode_text(name));
    }
    for field in &entry.fields {
        let value_class = match field.text {
            FieldText::NoData => "event-value no-data",
            FieldText::Value(_) => "event-value",
        };
        let _ = write!(
            html,
            "<div class=\"event-field\"><span class=\"event-label\">{}</span>: <span class=\"{}\">{}</span></div>",
            encode_text(&field.label),
            value_class,
            encode_text(field.text.display()),
        );
    }
    html.push_str("</div>");
    html
}

/// Renders the inline error shown when a run's stream breaks off.
pub fn render_error_html(message: &str) -> String {
    format!("<div class=\"event event-error\">{}</div>", encode_text(message))
}
