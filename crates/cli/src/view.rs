//! Writes console notifications to a terminal, as plain text or HTML.

use std::io::{self, Write};

use flowwatch_engine::ConsoleEvent;
use flowwatch_types::{RenderedEntry, RunId, RunStatus};
use flowwatch_util::{render_entry_html, render_error_html};

const VALUE_INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
}

/// Applies [`ConsoleEvent`]s to an output stream in arrival order.
pub struct TerminalView<W: Write> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn apply(&mut self, event: &ConsoleEvent) -> io::Result<()> {
        match event {
            ConsoleEvent::RunStarted { run_id, workflow } => {
                writeln!(self.out, "== run {run_id} started ({workflow})")?;
            }
            ConsoleEvent::StartFailed { workflow, message } => {
                writeln!(self.out, "!! could not start {workflow}: {message}")?;
            }
            ConsoleEvent::FocusChanged { run_id } => {
                writeln!(self.out, "== showing run {run_id}")?;
            }
            ConsoleEvent::LogCleared => {
                writeln!(self.out, "{}", "-".repeat(40))?;
            }
            ConsoleEvent::EntryAppended { entry, .. } => match self.format {
                OutputFormat::Text => write!(self.out, "{}", format_entry_text(entry))?,
                OutputFormat::Html => writeln!(self.out, "{}", render_entry_html(entry))?,
            },
            ConsoleEvent::ScrolledToLatest { .. } => {}
            ConsoleEvent::StreamFailed { message, .. } => match self.format {
                OutputFormat::Text => writeln!(self.out, "!! stream error: {message}")?,
                OutputFormat::Html => writeln!(self.out, "{}", render_error_html(message))?,
            },
            ConsoleEvent::RunFinished { run_id, status } => {
                writeln!(self.out, "== run {run_id} {status}")?;
            }
            ConsoleEvent::ResultAvailable { run_id, output } => {
                let pretty = serde_json::to_string_pretty(&output.to_json()).map_err(io::Error::other)?;
                writeln!(self.out, "== result of run {run_id}:\n{pretty}")?;
            }
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Plain text form of one entry: the name, then one indented line per field.
pub fn format_entry_text(entry: &RenderedEntry) -> String {
    let mut text = format!("[{}]\n", entry.title());
    for field in &entry.fields {
        let mut lines = field.text.display().lines();
        let first = lines.next().unwrap_or_default();
        text.push_str(&format!("  {}: {}\n", field.label, first));
        for line in lines {
            text.push_str(VALUE_INDENT);
            text.push_str(line);
            text.push('\n');
        }
    }
    text
}

/// Whether `event` ends following `run_id`: its result arrived or it failed.
pub fn ends_run(event: &ConsoleEvent, run_id: &RunId) -> bool {
    match event {
        ConsoleEvent::ResultAvailable { run_id: id, .. } => id == run_id,
        ConsoleEvent::RunFinished {
            run_id: id,
            status: RunStatus::Failed,
        } => id == run_id,
        _ => false,
    }
}
