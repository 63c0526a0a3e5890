//! Entry point tying runs, focus and the view together.

use std::sync::Arc;

use flowwatch_api::{ApiError, WorkflowBackend};
use flowwatch_types::{RenderedEntry, RunId, RunSummary, WorkflowOutput};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};

use crate::{
    controller::{ControllerError, RunController},
    selector::RunSelector,
    session::Session,
    view::{ConsoleEvent, ViewReceiver},
};

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("could not start workflow '{workflow}': {source}")]
    Start {
        workflow: String,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// A console session: starts runs, streams each one on its own task and
/// keeps the view pointed at one run at a time.
///
/// Must be used from within a Tokio runtime.
pub struct WorkflowConsole {
    backend: Arc<dyn WorkflowBackend>,
    session: Session,
    selector: RunSelector,
}

impl WorkflowConsole {
    /// Creates a console and the receiving end of its view notifications.
    pub fn new(backend: Arc<dyn WorkflowBackend>) -> (Self, ViewReceiver) {
        let (view_tx, view_rx) = unbounded_channel();
        let session = Session::new(view_tx);
        let console = Self {
            backend,
            selector: RunSelector::new(session.clone()),
            session,
        };
        (console, view_rx)
    }

    /// Starts `workflow`, registers the run, focuses it and spawns its
    /// ingestion task.
    ///
    /// A rejected start is reported to the view once and creates no run.
    pub async fn start_run(&self, workflow: &str, start_event: &Value) -> Result<RunId, ConsoleError> {
        let run_id = match self.backend.start_run(workflow, start_event).await {
            Ok(run_id) => run_id,
            Err(source) => {
                warn!(target: "flowwatch_console", workflow, error = %source, "workflow start failed");
                self.session.lock().emit(ConsoleEvent::StartFailed {
                    workflow: workflow.to_string(),
                    message: source.to_string(),
                });
                return Err(ConsoleError::Start {
                    workflow: workflow.to_string(),
                    source,
                });
            }
        };

        let mut controller = RunController::new(self.session.clone(), run_id.clone(), workflow);
        if let Err(error) = controller.begin() {
            self.session.lock().emit(ConsoleEvent::StartFailed {
                workflow: workflow.to_string(),
                message: error.to_string(),
            });
            return Err(error.into());
        }
        self.selector.focus(&run_id);

        let task = tokio::spawn(controller.drive(Arc::clone(&self.backend)));
        if let Err(error) = self.session.lock().store_mut().attach_task(&run_id, task.abort_handle()) {
            warn!(target: "flowwatch_console", %run_id, %error, "ingestion task not tracked");
        }
        info!(target: "flowwatch_console", %run_id, workflow, "run started");
        Ok(run_id)
    }

    /// Shows `run_id` in the view. Returns the number of replayed entries.
    pub fn focus(&self, run_id: &RunId) -> usize {
        self.selector.focus(run_id)
    }

    pub fn focused(&self) -> Option<RunId> {
        self.selector.focused()
    }

    pub fn runs(&self) -> Vec<RunSummary> {
        self.session.runs()
    }

    pub fn entries(&self, run_id: &RunId) -> Vec<RenderedEntry> {
        self.session.entries(run_id)
    }

    pub fn output(&self, run_id: &RunId) -> Option<WorkflowOutput> {
        self.session.output(run_id)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Aborts every ingestion task still running.
    pub fn shutdown(&self) -> usize {
        let aborted = self.session.lock().store_mut().abort_all();
        if aborted > 0 {
            info!(target: "flowwatch_console", aborted, "aborted running ingestion tasks");
        }
        aborted
    }
}
