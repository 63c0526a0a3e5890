//! Interactive line console over a [`WorkflowConsole`].

use std::io::{self, Stdout};
use std::sync::Arc;

use anyhow::{Context, Result};
use flowwatch_api::WorkflowBackend;
use flowwatch_engine::{ViewReceiver, WorkflowConsole};
use flowwatch_types::RunId;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::view::{OutputFormat, TerminalView};

const HELP: &str = "\
commands:
  start <workflow> [json]  start a run (start event defaults to {})
  focus <run_id>           show a run's log
  runs                     list runs of this session
  log                      replay the focused run's log
  help                     show this help
  quit                     leave the console";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Start { workflow: String, start_event: Value },
    Focus(RunId),
    Runs,
    Log,
    Help,
    Quit,
}

/// Parses one input line. Blank lines are `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "start" => {
            let (workflow, payload) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if workflow.is_empty() {
                return Err("usage: start <workflow> [json]".into());
            }
            let payload = payload.trim();
            let start_event = if payload.is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(payload).map_err(|error| format!("invalid start event: {error}"))?
            };
            ReplCommand::Start {
                workflow: workflow.to_string(),
                start_event,
            }
        }
        "focus" if !rest.is_empty() => ReplCommand::Focus(RunId::from(rest)),
        "focus" => return Err("usage: focus <run_id>".into()),
        "runs" => ReplCommand::Runs,
        "log" => ReplCommand::Log,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(Some(command))
}

pub async fn run_console(backend: Arc<dyn WorkflowBackend>, format: OutputFormat) -> Result<()> {
    let (console, mut events) = WorkflowConsole::new(backend);
    let mut view = TerminalView::new(io::stdout(), format);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                view.apply(&event).context("write console output")?;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("read console input")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(ReplCommand::Quit)) => break,
                    Ok(Some(command)) => execute(&console, command, &mut events, &mut view).await?,
                    Ok(None) => {}
                    Err(message) => println!("{message}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    console.shutdown();
    Ok(())
}

async fn execute(
    console: &WorkflowConsole,
    command: ReplCommand,
    events: &mut ViewReceiver,
    view: &mut TerminalView<Stdout>,
) -> Result<()> {
    debug!(target: "flowwatch_console", ?command, "console command");
    match command {
        ReplCommand::Start { workflow, start_event } => {
            // Failures already reached the view as `StartFailed`.
            let _ = console.start_run(&workflow, &start_event).await;
        }
        ReplCommand::Focus(run_id) => {
            console.focus(&run_id);
        }
        ReplCommand::Runs => {
            let runs = console.runs();
            if runs.is_empty() {
                println!("no runs yet");
            }
            let focused = console.focused();
            for run in runs {
                let marker = if focused.as_ref() == Some(&run.run_id) { "*" } else { " " };
                println!(
                    "{marker} {}  {}  {}  {} entries  started {}",
                    run.run_id,
                    run.workflow,
                    run.status,
                    run.entry_count,
                    run.started_at.format("%H:%M:%S")
                );
            }
        }
        ReplCommand::Log => match console.focused() {
            Some(run_id) => {
                console.focus(&run_id);
            }
            None => println!("no run focused"),
        },
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Quit => {}
    }
    while let Ok(event) = events.try_recv() {
        view.apply(&event).context("write console output")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_accepts_optional_json_payload() {
        assert_eq!(
            parse_command("start research {\"topic\": \"rust crates\"}"),
            Ok(Some(ReplCommand::Start {
                workflow: "research".into(),
                start_event: json!({"topic": "rust crates"}),
            }))
        );
        assert_eq!(
            parse_command("  start research  "),
            Ok(Some(ReplCommand::Start {
                workflow: "research".into(),
                start_event: json!({}),
            }))
        );
    }

    #[test]
    fn invalid_input_is_reported() {
        assert!(parse_command("start").is_err());
        assert!(parse_command("start research {oops").unwrap_err().starts_with("invalid start event"));
        assert!(parse_command("focus").is_err());
        assert!(parse_command("launch x").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn simple_commands_parse() {
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("focus abc123"), Ok(Some(ReplCommand::Focus("abc123".into()))));
        assert_eq!(parse_command("runs"), Ok(Some(ReplCommand::Runs)));
        assert_eq!(parse_command("log"), Ok(Some(ReplCommand::Log)));
        assert_eq!(parse_command("exit"), Ok(Some(ReplCommand::Quit)));
    }
}
