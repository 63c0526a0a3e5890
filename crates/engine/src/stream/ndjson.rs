//! Parsing of single NDJSON lines into event records.

use flowwatch_types::EventRecord;
use serde::de::IgnoredAny;

/// What one line of the event stream turned out to be.
#[derive(Debug)]
pub enum LineOutcome {
    /// Empty or whitespace only; skipped silently.
    Blank,
    Event(EventRecord),
    /// Not valid JSON. The caller logs it and moves on.
    Malformed(serde_json::Error),
}

/// Parses one line of a run's event stream.
///
/// Valid JSON that is not an object yields an empty record rather than an
/// error, so the line still shows up as an (empty) entry.
pub fn parse_event_line(line: &str) -> LineOutcome {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }

    if trimmed.starts_with('{') {
        return match serde_json::from_str::<EventRecord>(trimmed) {
            Ok(record) => LineOutcome::Event(record),
            Err(error) => LineOutcome::Malformed(error),
        };
    }

    match serde_json::from_str::<IgnoredAny>(trimmed) {
        Ok(_) => LineOutcome::Event(EventRecord::default()),
        Err(error) => LineOutcome::Malformed(error),
    }
}
