use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use weft_integration::{Integration, ToolParams, discover};
use weft_workflow::{ChannelNotifier, RunnerConfig, WorkflowRunner};

mod sample;

use sample::SampleIntegration;

/// Weft - compose schema-validated steps into workflows
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Log filter used when RUST_LOG is unset
  #[arg(long, global = true, default_value = "info")]
  log_level: String,

  /// Credentials for dynamic tools, as NAME=VALUE
  #[arg(long = "credential", global = true, value_parser = parse_credential)]
  credentials: Vec<(String, String)>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the sample integration's syncs, workflows and tools as JSON
  List,

  /// Run a workflow, sync or tool with a JSON payload read from stdin
  Run {
    /// Cancel the run after this many milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    target: RunTarget,
  },

  /// Run a workflow once per JSON line on stdin, printing events as JSON lines
  Serve {
    /// Name the workflow is registered under
    name: String,

    /// Deadline for steps that do not declare their own
    #[arg(long)]
    step_timeout_ms: Option<u64>,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run a registered workflow
  Workflow {
    /// Name the workflow is registered under
    name: String,
  },

  /// Invoke a registered sync
  Sync {
    /// The sync ID
    id: String,
  },

  /// Invoke a static or dynamic tool
  Tool {
    /// Key the tool is exposed under
    key: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(&cli.log_level)?;

  let params = cli
    .credentials
    .into_iter()
    .fold(ToolParams::new(), |params, (name, value)| {
      params.with_credential(name, value)
    });

  match cli.command {
    Some(Commands::List) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(list(params))?;
    }
    Some(Commands::Run { timeout_ms, target }) => {
      let payload = read_payload_from_stdin()?;
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run(target, payload, params, timeout_ms))?;
    }
    Some(Commands::Serve {
      name,
      step_timeout_ms,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      let result = rt.block_on(serve(name, step_timeout_ms));
      // Don't wait on a stdin read that may still be blocked.
      rt.shutdown_background();
      result?;
    }
    None => {
      println!("weft - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level))
    .with_context(|| format!("invalid log level: {}", level))?;

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
  Ok(())
}

async fn list(params: ToolParams) -> Result<()> {
  let integration = SampleIntegration::new().context("failed to build sample integration")?;
  let catalog = discover(&integration, &params, CancellationToken::new())
    .await
    .context("failed to discover integration")?;

  println!("{}", serde_json::to_string_pretty(&catalog)?);
  Ok(())
}

async fn run(
  target: RunTarget,
  payload: serde_json::Value,
  params: ToolParams,
  timeout_ms: Option<u64>,
) -> Result<()> {
  let integration = SampleIntegration::new().context("failed to build sample integration")?;
  let cancel = CancellationToken::new();
  spawn_canceller(cancel.clone(), timeout_ms);

  let output = match target {
    RunTarget::Workflow { name } => {
      let result = integration
        .run_workflow(&name, payload, cancel.clone())
        .await
        .with_context(|| format!("workflow '{}' failed", name))?;
      info!(
        execution_id = %result.execution_id,
        steps_executed = result.step_results.len(),
        "execution completed"
      );
      result.output
    }
    RunTarget::Sync { id } => integration
      .invoke_sync(&id, payload, cancel.clone())
      .await
      .with_context(|| format!("sync '{}' failed", id))?,
    RunTarget::Tool { key } => integration
      .invoke_tool(&key, payload, &params, cancel.clone())
      .await
      .with_context(|| format!("tool '{}' failed", key))?,
  };

  // Stop the canceller task.
  cancel.cancel();

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn serve(name: String, step_timeout_ms: Option<u64>) -> Result<()> {
  let integration = SampleIntegration::new().context("failed to build sample integration")?;
  let workflow = integration
    .workflows()
    .get(&name)
    .cloned()
    .with_context(|| format!("workflow '{}' not found", name))?;

  let (notifier, mut events) = ChannelNotifier::channel();
  let config = RunnerConfig {
    default_step_timeout_ms: step_timeout_ms,
    ..RunnerConfig::default()
  };
  let runner = WorkflowRunner::with_config(workflow, config).with_notifier(Arc::new(notifier));
  let sender = runner.sender();

  let cancel = CancellationToken::new();
  spawn_canceller(cancel.clone(), None);
  let runner_handle = tokio::spawn(runner.start(cancel.clone()));

  // Ends once the runner, and with it the notifier, is dropped.
  let printer = tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      match serde_json::to_string(&event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "failed to encode event"),
      }
    }
  });

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    let line = tokio::select! {
      _ = cancel.cancelled() => break,
      line = lines.next_line() => line.context("failed to read payload from stdin")?,
    };
    let Some(line) = line else {
      break;
    };
    if line.trim().is_empty() {
      continue;
    }
    let payload = match serde_json::from_str(&line) {
      Ok(payload) => payload,
      Err(e) => {
        warn!(error = %e, "skipping payload that is not valid JSON");
        continue;
      }
    };
    if sender.send(payload).await.is_err() {
      break;
    }
  }
  drop(sender);

  runner_handle.await.context("workflow runner task failed")??;
  printer.await.context("event printer task failed")?;

  // Stop the canceller task.
  cancel.cancel();
  Ok(())
}

/// Cancel `cancel` on Ctrl-C or once `timeout_ms` elapses.
fn spawn_canceller(cancel: CancellationToken, timeout_ms: Option<u64>) {
  tokio::spawn(async move {
    let deadline = async {
      match timeout_ms {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => std::future::pending::<()>().await,
      }
    };

    tokio::select! {
      _ = cancel.cancelled() => {}
      _ = tokio::signal::ctrl_c() => {
        warn!("interrupted, cancelling run");
        cancel.cancel();
      }
      _ = deadline => {
        warn!(timeout_ms = ?timeout_ms, "run timed out, cancelling");
        cancel.cancel();
      }
    }
  });
}

fn parse_credential(raw: &str) -> Result<(String, String)> {
  let Some((name, value)) = raw.split_once('=') else {
    bail!("expected NAME=VALUE, got '{}'", raw);
  };
  if name.is_empty() {
    bail!("credential name is empty in '{}'", raw);
  }
  Ok((name.to_string(), value.to_string()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_credential() {
    assert_eq!(
      parse_credential("api_key=abc=def").unwrap(),
      ("api_key".to_string(), "abc=def".to_string())
    );
    assert!(parse_credential("novalue").is_err());
    assert!(parse_credential("=x").is_err());
  }

  #[test]
  fn test_cli_parses_run_tool() {
    let cli = Cli::parse_from([
      "weft",
      "--credential",
      "api_key=abc",
      "run",
      "--timeout-ms",
      "500",
      "tool",
      "SAMPLE_TOOL",
    ]);
    assert_eq!(cli.credentials, vec![("api_key".to_string(), "abc".to_string())]);
    match cli.command {
      Some(Commands::Run {
        timeout_ms,
        target: RunTarget::Tool { key },
      }) => {
        assert_eq!(timeout_ms, Some(500));
        assert_eq!(key, "SAMPLE_TOOL");
      }
      _ => panic!("expected run tool"),
    }
  }

  #[test]
  fn test_cli_parses_serve() {
    let cli = Cli::parse_from(["weft", "serve", "SAMPLE_WORKFLOW", "--step-timeout-ms", "250"]);
    match cli.command {
      Some(Commands::Serve {
        name,
        step_timeout_ms,
      }) => {
        assert_eq!(name, "SAMPLE_WORKFLOW");
        assert_eq!(step_timeout_ms, Some(250));
      }
      _ => panic!("expected serve"),
    }
  }
}
