//! Request and response payloads of the workflow server's HTTP API.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Body of `POST /workflows/{name}/run-nowait`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRunRequest {
    /// The start event, serialized to a JSON string as the server expects.
    pub start_event: String,
    #[serde(default)]
    pub context: JsonMap<String, JsonValue>,
    #[serde(default)]
    pub kwargs: JsonMap<String, JsonValue>,
}

impl StartRunRequest {
    /// Wraps a start event payload; `context` and `kwargs` stay empty.
    pub fn new(start_event: &JsonValue) -> Self {
        Self {
            start_event: start_event.to_string(),
            context: JsonMap::new(),
            kwargs: JsonMap::new(),
        }
    }
}

/// Response of `POST /workflows/{name}/run-nowait`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRunResponse {
    #[serde(default)]
    pub handler_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of `GET /workflows`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowList {
    #[serde(default)]
    pub workflows: Vec<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Server-side state of a run handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerState {
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// One row of `GET /handlers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerInfo {
    pub handler_id: String,
    pub status: HandlerState,
    #[serde(default)]
    pub result: Option<JsonValue>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /handlers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerList {
    #[serde(default)]
    pub handlers: Vec<HandlerInfo>,
}
