use flowwatch_types::RunId;
use tracing::debug;

use crate::{session::Session, view::ConsoleEvent};

/// Decides which run's log the view shows.
///
/// Focusing never touches the store; it only moves the pointer and replays
/// what the store already holds. Controllers read the pointer when they
/// append, so a focus switch takes effect for the very next entry.
#[derive(Debug, Clone)]
pub struct RunSelector {
    session: Session,
}

impl RunSelector {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Focuses `run_id`, clears the view and replays its log in order.
    ///
    /// Unknown runs replay nothing. Returns the number of replayed entries.
    pub fn focus(&self, run_id: &RunId) -> usize {
        let mut guard = self.session.lock();
        let state = &mut *guard;
        state.set_focus(run_id.clone());
        state.emit(ConsoleEvent::FocusChanged { run_id: run_id.clone() });
        state.emit(ConsoleEvent::LogCleared);

        let entries = state.store().get(run_id);
        for entry in entries {
            state.emit(ConsoleEvent::EntryAppended {
                run_id: run_id.clone(),
                entry: entry.clone(),
            });
        }
        state.emit(ConsoleEvent::ScrolledToLatest { run_id: run_id.clone() });

        debug!(target: "flowwatch_console", %run_id, replayed = entries.len(), "focus changed");
        entries.len()
    }

    pub fn focused(&self) -> Option<RunId> {
        self.session.focused()
    }
}
