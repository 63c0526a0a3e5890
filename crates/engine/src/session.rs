//! State shared by every run of one console session.
//!
//! The run log store, the focus pointer and the view channel sit behind one
//! mutex. Whoever appends an entry checks focus and notifies the view while
//! holding it, so the view sees entries in store order.

use std::sync::{Arc, Mutex, MutexGuard};

use flowwatch_types::{RenderedEntry, RunId, RunStatus, RunSummary, WorkflowOutput};
use tracing::debug;

use crate::{
    store::{RunLogStore, StoreError},
    view::{ConsoleEvent, ViewSender},
};

#[derive(Debug)]
pub struct SessionState {
    store: RunLogStore,
    focused: Option<RunId>,
    view: ViewSender,
}

impl SessionState {
    pub fn store(&self) -> &RunLogStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RunLogStore {
        &mut self.store
    }

    pub fn focused(&self) -> Option<&RunId> {
        self.focused.as_ref()
    }

    pub fn is_focused(&self, run_id: &RunId) -> bool {
        self.focused.as_ref() == Some(run_id)
    }

    pub(crate) fn set_focus(&mut self, run_id: RunId) {
        self.focused = Some(run_id);
    }

    /// Sends a notification to the view. A closed view is ignored.
    pub fn emit(&self, event: ConsoleEvent) {
        if self.view.send(event).is_err() {
            debug!(target: "flowwatch_console", "view receiver dropped; notification discarded");
        }
    }

    /// Appends to the run's log and, when the run is focused, to the view.
    pub fn append_entry(&mut self, run_id: &RunId, entry: RenderedEntry) -> Result<usize, StoreError> {
        let live = self.is_focused(run_id).then(|| entry.clone());
        let len = self.store.append(run_id, entry)?;
        if let Some(entry) = live {
            self.emit(ConsoleEvent::EntryAppended {
                run_id: run_id.clone(),
                entry,
            });
        }
        Ok(len)
    }

    /// Records a status change and tells the view when the run has finished.
    pub fn finish_run(&mut self, run_id: &RunId, status: RunStatus) -> Result<(), StoreError> {
        self.store.set_status(run_id, status)?;
        if status.is_terminal() {
            self.emit(ConsoleEvent::RunFinished {
                run_id: run_id.clone(),
                status,
            });
        }
        Ok(())
    }

    pub fn publish_result(&mut self, run_id: &RunId, output: WorkflowOutput) -> Result<(), StoreError> {
        self.store.set_output(run_id, output.clone())?;
        self.emit(ConsoleEvent::ResultAvailable {
            run_id: run_id.clone(),
            output,
        });
        Ok(())
    }
}

/// Cheaply cloneable handle to the session state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    pub fn new(view: ViewSender) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                store: RunLogStore::new(),
                focused: None,
                view,
            })),
        }
    }

    /// Locks the session. Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().expect("session lock poisoned")
    }

    pub fn focused(&self) -> Option<RunId> {
        self.lock().focused.clone()
    }

    /// Copy of a run's log; empty for unknown runs.
    pub fn entries(&self, run_id: &RunId) -> Vec<RenderedEntry> {
        self.lock().store.get(run_id).to_vec()
    }

    pub fn runs(&self) -> Vec<RunSummary> {
        self.lock().store.runs()
    }

    pub fn record(&self, run_id: &RunId) -> Option<RunSummary> {
        self.lock().store.record(run_id)
    }

    pub fn output(&self, run_id: &RunId) -> Option<WorkflowOutput> {
        self.lock().store.output(run_id).cloned()
    }
}
