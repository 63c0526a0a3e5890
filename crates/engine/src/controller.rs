//! Per-run orchestration from the first chunk to the final result.
//!
//! A [`RunController`] owns its decoder and nothing else. Everything it shares
//! with other runs (the store and the focus pointer) is reached through the
//! [`Session`], one short lock per chunk.

use std::{fmt, mem, sync::Arc};

use flowwatch_api::WorkflowBackend;
use flowwatch_types::{RenderedEntry, RunId, RunStatus};
use flowwatch_util::truncate_for_summary;
use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    render::render_event,
    session::Session,
    store::StoreError,
    stream::{ChunkDecoder, LineOutcome, parse_event_line},
    view::ConsoleEvent,
};

/// Longest excerpt of a malformed line written to the log.
const MALFORMED_EXCERPT_LEN: usize = 120;

/// Lifecycle of one run as seen by its controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Starting,
    Streaming,
    Completed,
    /// The transport broke off; carries the error shown to the viewer.
    Failed(String),
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    pub fn status(&self) -> RunStatus {
        match self {
            Self::Starting => RunStatus::Starting,
            Self::Streaming => RunStatus::Streaming,
            Self::Completed => RunStatus::Completed,
            Self::Failed(_) => RunStatus::Failed,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status().as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("cannot {action} run {run_id} while it is {phase}")]
    InvalidTransition {
        run_id: RunId,
        phase: RunStatus,
        action: &'static str,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State machine for one run: `Starting -> Streaming -> Completed | Failed`.
#[derive(Debug)]
pub struct RunController {
    run_id: RunId,
    workflow: String,
    session: Session,
    decoder: ChunkDecoder,
    phase: RunPhase,
}

impl RunController {
    pub fn new(session: Session, run_id: RunId, workflow: impl Into<String>) -> Self {
        Self {
            run_id,
            workflow: workflow.into(),
            session,
            decoder: ChunkDecoder::new(),
            phase: RunPhase::Starting,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    /// Registers the run in the store and starts streaming.
    pub fn begin(&mut self) -> Result<(), ControllerError> {
        self.require(&[RunStatus::Starting], "begin")?;
        {
            let mut state = self.session.lock();
            state.store_mut().create_run(self.run_id.clone(), self.workflow.clone())?;
            state.store_mut().set_status(&self.run_id, RunStatus::Streaming)?;
            state.emit(ConsoleEvent::RunStarted {
                run_id: self.run_id.clone(),
                workflow: self.workflow.clone(),
            });
        }
        self.phase = RunPhase::Streaming;
        info!(target: "flowwatch_stream", run_id = %self.run_id, workflow = %self.workflow, "run streaming");
        Ok(())
    }

    /// Feeds one chunk of the event stream through decoding, parsing and
    /// rendering, appending every resulting entry. Returns how many were
    /// appended.
    pub fn ingest_chunk(&mut self, chunk: &[u8]) -> Result<usize, ControllerError> {
        self.require(&[RunStatus::Streaming], "ingest into")?;

        let entries: Vec<RenderedEntry> = self
            .decoder
            .feed(chunk)
            .iter()
            .filter_map(|line| match parse_event_line(line) {
                LineOutcome::Blank => None,
                LineOutcome::Event(record) => Some(render_event(&record)),
                LineOutcome::Malformed(error) => {
                    warn!(
                        target: "flowwatch_stream",
                        run_id = %self.run_id,
                        %error,
                        line = %truncate_for_summary(line, MALFORMED_EXCERPT_LEN),
                        "skipping malformed event line"
                    );
                    None
                }
            })
            .collect();

        if entries.is_empty() {
            return Ok(0);
        }
        let appended = entries.len();
        let mut state = self.session.lock();
        for entry in entries {
            state.append_entry(&self.run_id, entry)?;
        }
        Ok(appended)
    }

    /// Marks the stream as ended normally.
    pub fn complete(&mut self) -> Result<(), ControllerError> {
        self.require(&[RunStatus::Streaming], "complete")?;
        if let Some(rest) = mem::take(&mut self.decoder).finish() {
            debug!(
                target: "flowwatch_stream",
                run_id = %self.run_id,
                remainder = %truncate_for_summary(&rest, MALFORMED_EXCERPT_LEN),
                "discarding unterminated final line"
            );
        }
        self.session.lock().finish_run(&self.run_id, RunStatus::Completed)?;
        self.phase = RunPhase::Completed;
        info!(target: "flowwatch_stream", run_id = %self.run_id, "run completed");
        Ok(())
    }

    /// Marks the run as failed. The viewer gets one inline error if the run
    /// is focused; the run log is left untouched.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), ControllerError> {
        self.require(&[RunStatus::Starting, RunStatus::Streaming], "fail")?;
        let message = message.into();
        {
            let mut state = self.session.lock();
            if state.store().contains(&self.run_id) {
                if state.is_focused(&self.run_id) {
                    state.emit(ConsoleEvent::StreamFailed {
                        run_id: self.run_id.clone(),
                        message: message.clone(),
                    });
                }
                state.finish_run(&self.run_id, RunStatus::Failed)?;
            }
        }
        warn!(target: "flowwatch_stream", run_id = %self.run_id, error = %message, "run failed");
        self.phase = RunPhase::Failed(message);
        Ok(())
    }

    /// Streams the run's events to the end, then fetches its result.
    ///
    /// Registers the run first if [`RunController::begin`] has not been
    /// called. Transport errors end the run as failed without a result.
    pub async fn drive(mut self, backend: Arc<dyn WorkflowBackend>) -> RunPhase {
        if self.phase == RunPhase::Starting
            && let Err(error) = self.begin()
        {
            warn!(target: "flowwatch_stream", run_id = %self.run_id, %error, "run could not be registered");
            return self.phase;
        }

        let mut events = match backend.open_events(&self.run_id).await {
            Ok(events) => events,
            Err(error) => {
                self.fail_quietly(error.to_string());
                return self.phase;
            }
        };

        while let Some(chunk) = events.next().await {
            let result = match chunk {
                Ok(bytes) => self.ingest_chunk(&bytes).map(|_| ()),
                Err(error) => {
                    self.fail_quietly(error.to_string());
                    return self.phase;
                }
            };
            if let Err(error) = result {
                warn!(target: "flowwatch_stream", run_id = %self.run_id, %error, "stopping ingestion");
                self.fail_quietly(error.to_string());
                return self.phase;
            }
        }
        drop(events);

        if let Err(error) = self.complete() {
            warn!(target: "flowwatch_stream", run_id = %self.run_id, %error, "run could not be completed");
            return self.phase;
        }

        let output = backend.fetch_result(&self.run_id).await;
        if let Err(error) = self.session.lock().publish_result(&self.run_id, output) {
            warn!(target: "flowwatch_stream", run_id = %self.run_id, %error, "result could not be recorded");
        }
        self.phase
    }

    fn fail_quietly(&mut self, message: String) {
        if let Err(error) = self.fail(message) {
            warn!(target: "flowwatch_stream", run_id = %self.run_id, %error, "failure could not be recorded");
        }
    }

    fn require(&self, allowed: &[RunStatus], action: &'static str) -> Result<(), ControllerError> {
        let phase = self.phase.status();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition {
                run_id: self.run_id.clone(),
                phase,
                action,
            })
        }
    }
}
