//! The seam between run orchestration and the workflow server.

use async_trait::async_trait;
use bytes::Bytes;
use flowwatch_types::{RunId, WorkflowOutput};
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::ApiError;

/// Raw body chunks of a run's event stream, in arrival order.
pub type EventByteStream = BoxStream<'static, Result<Bytes, ApiError>>;

/// Operations a console needs from a workflow server.
///
/// [`crate::WorkflowClient`] talks HTTP; tests substitute scripted backends.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Starts `workflow` without waiting for it and returns the new run's id.
    async fn start_run(&self, workflow: &str, start_event: &Value) -> Result<RunId, ApiError>;

    /// Opens the NDJSON event stream of a run.
    async fn open_events(&self, run_id: &RunId) -> Result<EventByteStream, ApiError>;

    /// Retrieves the final result of a finished run.
    ///
    /// Never fails: retrieval problems come back as [`WorkflowOutput::Error`].
    async fn fetch_result(&self, run_id: &RunId) -> WorkflowOutput;
}
