mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use execlens_api::PlatformClient;
use execlens_config::ExeclensConfig;
use execlens_render::{ChannelTarget, RenderTarget};
use execlens_viewer::{FetchError, FetchOrchestrator, FetchOutcome, WatchExit};

use crate::terminal::TerminalTarget;

/// Execlens - view integration execution logs, step results and linked executions
#[derive(Parser)]
#[command(name = "execlens")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the config file (default: <config dir>/execlens/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// GraphQL endpoint, overrides config and environment
  #[arg(long, global = true)]
  endpoint: Option<String>,

  /// API token, overrides config and environment
  #[arg(long, global = true)]
  token: Option<String>,

  /// Print render events as JSON lines instead of text
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show one execution's logs and step status
  View {
    execution_id: String,

    /// Keep reloading while the execution is running
    #[arg(long)]
    follow: bool,
  },

  /// Replay an execution and show the new run
  Replay { execution_id: String },
}

enum Action {
  View { follow: bool },
  Replay,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("execlens=info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let config = load_config(&cli)?;
  let (execution_id, action) = match cli.command {
    Commands::View {
      execution_id,
      follow,
    } => (execution_id, Action::View { follow }),
    Commands::Replay { execution_id } => (execution_id, Action::Replay),
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    if cli.json {
      run_json(config, execution_id, action).await
    } else {
      run_terminal(config, execution_id, action).await
    }
  })
}

fn load_config(cli: &Cli) -> Result<ExeclensConfig> {
  let path = cli.config.clone().or_else(ExeclensConfig::default_path);
  let mut config = match path {
    Some(path) => ExeclensConfig::load_or_default(&path)
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => ExeclensConfig::default(),
  };

  config.apply_env();
  if let Some(endpoint) = &cli.endpoint {
    config.api.endpoint = endpoint.clone();
  }
  if let Some(token) = &cli.token {
    config.api.api_token = Some(token.clone());
  }
  config.validate().context("invalid configuration")?;
  Ok(config)
}

fn orchestrator<T: RenderTarget>(
  config: &ExeclensConfig,
  target: T,
) -> Result<FetchOrchestrator<PlatformClient, T>> {
  let client = PlatformClient::from_config(&config.api).context("failed to create API client")?;
  Ok(FetchOrchestrator::new(
    Arc::new(client),
    target,
    config.streams.clone(),
    config.viewer.clone(),
  ))
}

async fn run_terminal(config: ExeclensConfig, execution_id: String, action: Action) -> Result<()> {
  let viewer = orchestrator(&config, TerminalTarget::new(std::io::stdout(), true))?;
  viewer.set_execution_id(&execution_id);

  let result = run(&viewer, action).await;
  viewer.with_target(TerminalTarget::print_navigation);
  result.with_context(|| format!("failed to show execution {execution_id}"))
}

async fn run_json(config: ExeclensConfig, execution_id: String, action: Action) -> Result<()> {
  let (sender, mut receiver) = mpsc::unbounded_channel();
  let printer = tokio::spawn(async move {
    while let Some(event) = receiver.recv().await {
      match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode render event"),
      }
    }
  });

  let viewer = orchestrator(&config, ChannelTarget::new(sender))?;
  viewer.set_execution_id(&execution_id);
  let result = run(&viewer, action).await;

  // Closes the channel so the printer drains and exits.
  drop(viewer);
  printer.await.context("event printer failed")?;
  result.with_context(|| format!("failed to show execution {execution_id}"))
}

async fn run<T: RenderTarget>(
  viewer: &FetchOrchestrator<PlatformClient, T>,
  action: Action,
) -> Result<(), FetchError> {
  let outcome = match action {
    Action::Replay => viewer.replay().await?,
    Action::View { follow: false } => viewer.fetch_results().await?,
    Action::View { follow: true } => {
      let cancel = CancellationToken::new();
      let on_interrupt = cancel.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          on_interrupt.cancel();
        }
      });

      match viewer.follow(cancel).await? {
        WatchExit::Finished { status, cycles } => {
          eprintln!("execution finished with status {status} after {cycles} loads");
        }
        WatchExit::Cancelled { .. } => eprintln!("stopped following"),
        WatchExit::Superseded { .. } => {}
      }
      return Ok(());
    }
  };

  if let FetchOutcome::Completed(summary) = outcome {
    eprintln!(
      "{} of {} logs, {} step results, {} linked executions",
      summary.logs_loaded, summary.total_logs, summary.step_results, summary.linked_executions
    );
  }
  Ok(())
}
