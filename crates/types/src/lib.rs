//! Shared type definitions for the flowwatch workspace.
//!
//! Everything that crosses a crate boundary lives here: run identifiers and
//! statuses, the event records parsed from a run's NDJSON stream, the
//! display-ready entries stored in the run log, the final workflow output and
//! the request/response payloads exchanged with the workflow server.

use std::{error::Error, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod event;
pub mod server;

pub use config::ConsoleConfig;
pub use event::{EventRecord, FieldText, NO_DATA_MARKER, RenderedEntry, RenderedField};
pub use server::{HandlerInfo, HandlerList, HandlerState, HealthStatus, StartRunRequest, StartRunResponse, WorkflowList};

/// Prefix used for every result-retrieval failure surfaced in place of a result.
pub const RESULT_ERROR_PREFIX: &str = "Error while fetching workflow data";

/// Server-assigned identifier of one workflow run (the server's `handler_id`).
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status of a run as observed by the console.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The start request succeeded and the run is being registered.
    #[default]
    Starting,
    /// The event stream is open and entries are arriving.
    Streaming,
    /// The event stream ended normally.
    Completed,
    /// The event stream broke off with a transport error.
    Failed,
}

impl RunStatus {
    /// Returns `true` once the run can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = ParseRunStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starting" => Ok(Self::Starting),
            "streaming" => Ok(Self::Streaming),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseRunStatusError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRunStatusError;

impl fmt::Display for ParseRunStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid run status; expected 'starting', 'streaming', 'completed' or 'failed'")
    }
}

impl Error for ParseRunStatusError {}

/// Read-only snapshot of one run used by run-list views.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub workflow: String,
    pub status: RunStatus,
    pub entry_count: usize,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Final outcome of a run once its stream has ended.
///
/// Retrieval failures are values, not faults: they are carried as
/// [`WorkflowOutput::Error`] and shown in place of the result. The JSON shape
/// handed to viewers comes from [`WorkflowOutput::to_json`]; a successful
/// result is never reinterpreted as an error, whatever its fields.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowOutput {
    Error {
        status: Option<u16>,
        error: String,
    },
    Result(serde_json::Value),
}

impl WorkflowOutput {
    /// Builds the output from a successful `/results` response body.
    ///
    /// The server either wraps the result as `{"result": ...}` or returns the
    /// result fields directly at the top level.
    pub fn from_response_body(body: serde_json::Value) -> Self {
        match body {
            serde_json::Value::Object(mut map) if map.contains_key("result") => {
                Self::Result(map.remove("result").unwrap_or(serde_json::Value::Null))
            }
            other => Self::Result(other),
        }
    }

    /// Error output for a non-success HTTP status and its raw body text.
    pub fn http_error(status: u16, body: &str) -> Self {
        Self::Error {
            status: Some(status),
            error: format!("{RESULT_ERROR_PREFIX}: [{status}] {body}"),
        }
    }

    /// Error output for failures that never produced an HTTP status.
    pub fn transport_error(message: impl fmt::Display) -> Self {
        Self::Error {
            status: None,
            error: format!("{RESULT_ERROR_PREFIX}: {message}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// JSON object handed to output widgets: the result itself or `{"error": ...}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Result(value) => value.clone(),
            Self::Error { error, .. } => serde_json::json!({ "error": error }),
        }
    }
}
