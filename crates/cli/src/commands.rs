use std::io;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use flowwatch_api::{WorkflowBackend, WorkflowClient};
use flowwatch_engine::{ConsoleEvent, WorkflowConsole};
use flowwatch_types::HandlerState;
use serde_json::Value;

use crate::view::{OutputFormat, TerminalView, ends_run};

pub async fn list_workflows(client: &WorkflowClient) -> Result<()> {
    let workflows = client.list_workflows().await.context("list workflows")?;
    if workflows.is_empty() {
        println!("No workflows available");
    }
    for name in workflows {
        println!("{name}");
    }
    Ok(())
}

pub async fn health(client: &WorkflowClient) -> Result<()> {
    let health = client.health().await.context("check server health")?;
    println!("{}: {}", client.base_url(), health.status);
    if !health.is_healthy() {
        bail!("workflow server reports '{}'", health.status);
    }
    Ok(())
}

pub async fn list_handlers(client: &WorkflowClient) -> Result<()> {
    let handlers = client.list_handlers().await.context("list handlers")?;
    if handlers.is_empty() {
        println!("No handlers");
    }
    for handler in handlers {
        let status = match handler.status {
            HandlerState::Running => "running",
            HandlerState::Completed => "completed",
            HandlerState::Failed => "failed",
            HandlerState::Unknown => "unknown",
        };
        match handler.error {
            Some(error) => println!("{}  {status}  {error}", handler.handler_id),
            None => println!("{}  {status}", handler.handler_id),
        }
    }
    Ok(())
}

/// Starts one run and follows it live until its result arrives.
pub async fn run_workflow(
    backend: Arc<dyn WorkflowBackend>,
    workflow: &str,
    start_event: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let start_event: Value = match start_event {
        Some(raw) => serde_json::from_str(raw).context("parse --start-event as JSON")?,
        None => Value::Object(Default::default()),
    };

    let (console, mut events) = WorkflowConsole::new(backend);
    let mut view = TerminalView::new(io::stdout(), format);
    let started = console.start_run(workflow, &start_event).await;
    let run_id = match started {
        Ok(run_id) => run_id,
        Err(error) => {
            while let Ok(event) = events.try_recv() {
                view.apply(&event)?;
            }
            return Err(error).context("start workflow run");
        }
    };

    let mut failed = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                view.apply(&event)?;
                if let ConsoleEvent::ResultAvailable { output, .. } = &event {
                    failed = output.is_error();
                }
                if ends_run(&event, &run_id) {
                    failed |= matches!(event, ConsoleEvent::RunFinished { .. });
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                console.shutdown();
                bail!("interrupted while following run {run_id}");
            }
        }
    }

    if failed {
        bail!("run {run_id} did not finish successfully");
    }
    Ok(())
}
