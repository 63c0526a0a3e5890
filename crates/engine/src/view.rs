//! Notifications sent from the engine to whatever renders the console.

use flowwatch_types::{RenderedEntry, RunId, RunStatus, WorkflowOutput};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// One change the view should apply, in the order it must be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    RunStarted { run_id: RunId, workflow: String },
    /// The server refused to start a run; no run exists for it.
    StartFailed { workflow: String, message: String },
    FocusChanged { run_id: RunId },
    /// The visible log must be emptied before a replay.
    LogCleared,
    /// Append an entry to the visible log. Only sent for the focused run.
    EntryAppended { run_id: RunId, entry: RenderedEntry },
    ScrolledToLatest { run_id: RunId },
    /// Inline error for the focused run's broken stream. Not kept in the run log.
    StreamFailed { run_id: RunId, message: String },
    RunFinished { run_id: RunId, status: RunStatus },
    ResultAvailable { run_id: RunId, output: WorkflowOutput },
}

pub type ViewSender = UnboundedSender<ConsoleEvent>;
pub type ViewReceiver = UnboundedReceiver<ConsoleEvent>;
