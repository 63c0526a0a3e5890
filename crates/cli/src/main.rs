use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowwatch_api::WorkflowClient;
use flowwatch_util::load_config;

mod commands;
mod repl;
mod view;

use view::OutputFormat;

/// Start workflow runs on a workflow server and watch their events live.
#[derive(Debug, Parser)]
#[command(name = "flowwatch", version, about)]
struct Cli {
    /// Workflow server URL. Overrides FLOWWATCH_BASE_URL and the config file.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the workflows the server can run
    Workflows,
    /// Check that the server is up
    Health,
    /// List run handlers known to the server
    Handlers,
    /// Start a workflow and follow its events until it finishes
    Run {
        workflow: String,
        /// Start event as a JSON object
        #[arg(long)]
        start_event: Option<String>,
        /// Print entries as escaped HTML blocks
        #[arg(long)]
        html: bool,
    },
    /// Interactive console for several concurrent runs
    Console {
        /// Print entries as escaped HTML blocks
        #[arg(long)]
        html: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    let client = WorkflowClient::new(&config).context("configure workflow server client")?;

    match cli.command {
        Command::Workflows => commands::list_workflows(&client).await,
        Command::Health => commands::health(&client).await,
        Command::Handlers => commands::list_handlers(&client).await,
        Command::Run {
            workflow,
            start_event,
            html,
        } => commands::run_workflow(Arc::new(client), &workflow, start_event.as_deref(), output_format(html)).await,
        Command::Console { html } => repl::run_console(Arc::new(client), output_format(html)).await,
    }
}

/// Logs go to stderr so stdout carries only console output.
fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn output_format(html: bool) -> OutputFormat {
    if html { OutputFormat::Html } else { OutputFormat::Text }
}
