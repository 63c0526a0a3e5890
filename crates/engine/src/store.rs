//! Per-run history of rendered entries.
//!
//! The store is created once per console session and lives as long as it
//! does. Entries are only ever appended; a run id can be registered once.

use chrono::{DateTime, Utc};
use flowwatch_types::{RenderedEntry, RunId, RunStatus, RunSummary, WorkflowOutput};
use indexmap::IndexMap;
use thiserror::Error;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("run {0} is already registered")]
    DuplicateRun(RunId),
    #[error("run {0} is not registered")]
    UnknownRun(RunId),
}

#[derive(Debug)]
struct RunLog {
    workflow: String,
    status: RunStatus,
    entries: Vec<RenderedEntry>,
    output: Option<WorkflowOutput>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    task: Option<AbortHandle>,
}

impl RunLog {
    fn summary(&self, run_id: &RunId) -> RunSummary {
        RunSummary {
            run_id: run_id.clone(),
            workflow: self.workflow.clone(),
            status: self.status,
            entry_count: self.entries.len(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Ordered logs of every run started in this session, keyed by run id.
#[derive(Debug, Default)]
pub struct RunLogStore {
    runs: IndexMap<RunId, RunLog>,
}

impl RunLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a run with an empty log.
    pub fn create_run(&mut self, run_id: RunId, workflow: impl Into<String>) -> Result<(), StoreError> {
        if self.runs.contains_key(&run_id) {
            return Err(StoreError::DuplicateRun(run_id));
        }
        self.runs.insert(
            run_id,
            RunLog {
                workflow: workflow.into(),
                status: RunStatus::Starting,
                entries: Vec::new(),
                output: None,
                started_at: Utc::now(),
                finished_at: None,
                task: None,
            },
        );
        Ok(())
    }

    /// Appends an entry and returns the run's new log length.
    pub fn append(&mut self, run_id: &RunId, entry: RenderedEntry) -> Result<usize, StoreError> {
        let log = self.log_mut(run_id)?;
        log.entries.push(entry);
        Ok(log.entries.len())
    }

    /// Full log of a run in append order; empty for unknown runs.
    pub fn get(&self, run_id: &RunId) -> &[RenderedEntry] {
        self.runs.get(run_id).map(|log| log.entries.as_slice()).unwrap_or_default()
    }

    pub fn contains(&self, run_id: &RunId) -> bool {
        self.runs.contains_key(run_id)
    }

    pub fn set_status(&mut self, run_id: &RunId, status: RunStatus) -> Result<(), StoreError> {
        let log = self.log_mut(run_id)?;
        log.status = status;
        if status.is_terminal() && log.finished_at.is_none() {
            log.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn set_output(&mut self, run_id: &RunId, output: WorkflowOutput) -> Result<(), StoreError> {
        self.log_mut(run_id)?.output = Some(output);
        Ok(())
    }

    pub fn output(&self, run_id: &RunId) -> Option<&WorkflowOutput> {
        self.runs.get(run_id).and_then(|log| log.output.as_ref())
    }

    pub fn record(&self, run_id: &RunId) -> Option<RunSummary> {
        self.runs.get(run_id).map(|log| log.summary(run_id))
    }

    /// Summaries of all runs in the order they were created.
    pub fn runs(&self) -> Vec<RunSummary> {
        self.runs.iter().map(|(run_id, log)| log.summary(run_id)).collect()
    }

    /// Keeps the handle of the task ingesting `run_id`.
    pub fn attach_task(&mut self, run_id: &RunId, task: AbortHandle) -> Result<(), StoreError> {
        self.log_mut(run_id)?.task = Some(task);
        Ok(())
    }

    /// Aborts every ingestion task still running. Returns how many were aborted.
    pub fn abort_all(&mut self) -> usize {
        let mut aborted = 0;
        for task in self.runs.values_mut().filter_map(|log| log.task.take()) {
            if !task.is_finished() {
                task.abort();
                aborted += 1;
            }
        }
        aborted
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn log_mut(&mut self, run_id: &RunId) -> Result<&mut RunLog, StoreError> {
        self.runs
            .get_mut(run_id)
            .ok_or_else(|| StoreError::UnknownRun(run_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowwatch_types::{FieldText, RenderedField};

    fn entry(name: &str) -> RenderedEntry {
        RenderedEntry {
            qualified_name: Some(name.into()),
            fields: vec![RenderedField::new("msg", FieldText::Value(name.to_lowercase()))],
        }
    }

    #[test]
    fn runs_are_registered_once() {
        let mut store = RunLogStore::new();
        store.create_run("abc123".into(), "research").unwrap();
        assert_eq!(
            store.create_run("abc123".into(), "research"),
            Err(StoreError::DuplicateRun("abc123".into()))
        );
        assert!(store.get(&"abc123".into()).is_empty());
    }

    #[test]
    fn append_requires_a_registered_run() {
        let mut store = RunLogStore::new();
        assert_eq!(
            store.append(&"ghost".into(), entry("A")),
            Err(StoreError::UnknownRun("ghost".into()))
        );
        assert!(store.get(&"ghost".into()).is_empty());
    }

    #[test]
    fn entries_keep_append_order_per_run() {
        let mut store = RunLogStore::new();
        let a = RunId::from("a");
        let b = RunId::from("b");
        store.create_run(a.clone(), "wf").unwrap();
        store.create_run(b.clone(), "wf").unwrap();

        assert_eq!(store.append(&a, entry("One")), Ok(1));
        store.append(&b, entry("Other")).unwrap();
        assert_eq!(store.append(&a, entry("Two")), Ok(2));

        let names: Vec<&str> = store.get(&a).iter().map(RenderedEntry::title).collect();
        assert_eq!(names, vec!["One", "Two"]);
        assert_eq!(store.get(&b).len(), 1);
    }

    #[test]
    fn summaries_follow_creation_order_and_status() {
        let mut store = RunLogStore::new();
        store.create_run("second".into(), "wf-b").unwrap();
        store.create_run("first".into(), "wf-a").unwrap();
        store.set_status(&"second".into(), RunStatus::Completed).unwrap();

        let runs = store.runs();
        assert_eq!(runs[0].run_id.as_str(), "second");
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert!(runs[0].finished_at.is_some());
        assert_eq!(runs[1].workflow, "wf-a");
        assert!(runs[1].finished_at.is_none());
    }

    #[tokio::test]
    async fn abort_all_stops_attached_tasks() {
        let mut store = RunLogStore::new();
        let run_id = RunId::from("slow");
        store.create_run(run_id.clone(), "wf").unwrap();
        let task = tokio::spawn(std::future::pending::<()>());
        store.attach_task(&run_id, task.abort_handle()).unwrap();

        assert_eq!(store.abort_all(), 1);
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(store.abort_all(), 0);
    }
}
