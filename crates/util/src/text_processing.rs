//! # Text Processing Utilities
//!
//! Redaction and truncation applied to server-supplied text before it is
//! written to diagnostics logs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Redacts values that look like secrets in a string.
///
/// Authorization headers, `*_KEY`/`*_TOKEN`/`*_SECRET`/`*_PASSWORD`
/// assignments and JSON string members with those names keep their key and
/// lose their value.
///
/// # Example
/// ```rust
/// use flowwatch_util::text_processing::redact_sensitive;
///
/// let redacted = redact_sensitive("API_KEY=abc123 TOKEN=xyz789");
/// assert_eq!(redacted, "API_KEY=[REDACTED] TOKEN=[REDACTED]");
///
/// let redacted = redact_sensitive(r#"{"api_token":"s3cr3t","topic":"rust"}"#);
/// assert_eq!(redacted, r#"{"api_token":"[REDACTED]","topic":"rust"}"#);
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in redact_patterns().iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &regex::Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                let suffix = captures.get(3).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}[REDACTED]{suffix}")
            })
            .to_string();
    }
    redacted
}

fn redact_patterns() -> &'static Vec<Regex> {
    static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
        [
            r"(?i)(authorization:\s*)([^\r\n]+)()",
            r"(?i)(\b[A-Z0-9_]*(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)()",
            r#"(?i)("[a-z0-9_\-]*(?:key|token|secret|password)"\s*:\s*")([^"]*)(")"#,
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    });
    &PATTERNS
}

/// Shortens text to `max_len` characters, appending `...` when cut.
///
/// Used to keep offending NDJSON lines readable in warnings.
pub fn truncate_for_summary(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    // Reserve space for the trailing ellipsis ("...").
    let target_len = max_len.saturating_sub(3);
    let truncated: String = trimmed.chars().take(target_len).collect();
    format!("{}...", truncated.trim_end())
}
