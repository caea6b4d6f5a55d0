//! Command-line front end for local workflow runs: load a workflow
//! definition from disk, build it, drive it to completion, and print
//! the resulting [`loomwork_engine::ExecutionResult`] as JSON.

mod config;
mod echo;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loomwork_action::NodeHandler;
use loomwork_engine::{ExecutionOptions, HandlerRegistry};
use loomwork_eventbus::Hooks;
use loomwork_resilience::RetryPolicy;
use loomwork_safety::SafetyConfig;
use loomwork_workflow::{NodeType, WorkflowDefinition};
use serde_json::Value;

use crate::config::AppConfig;
use crate::echo::EchoHandler;

#[derive(Parser)]
#[command(name = "loomwork", version, about = "Run and inspect Loomwork workflow definitions")]
struct Cli {
    /// Path to a TOML config file. Defaults to `~/.config/loomwork/config.toml`
    /// if present, then falls back to built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<logging::LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and execute a workflow definition to completion.
    Run {
        /// Path to a workflow definition file (`.json`, `.yaml`/`.yml`).
        workflow: PathBuf,
        /// Trigger input: an inline JSON literal, or `@path` to read it
        /// from a file. Defaults to `{}`.
        #[arg(long)]
        input: Option<String>,
        /// Upper bound on concurrently ready nodes per scheduler tick.
        /// Overrides the workflow's own `config.maxConcurrentNodes`.
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Enable the safety pipeline's default checks (PII redaction,
        /// prompt-injection warning, content moderation) for this run.
        #[arg(long)]
        safety: bool,
    },
    /// Build a workflow definition and report validation errors without
    /// executing it.
    Validate {
        /// Path to a workflow definition file (`.json`, `.yaml`/`.yml`).
        workflow: PathBuf,
    },
}

fn load_workflow_definition(path: &std::path::Path) -> Result<WorkflowDefinition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading workflow definition at {}", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&raw).context("parsing workflow definition as YAML"),
        _ => serde_json::from_str(&raw).context("parsing workflow definition as JSON"),
    }
}

fn load_trigger_input(arg: Option<&str>) -> Result<Value> {
    match arg {
        None => Ok(Value::Object(serde_json::Map::new())),
        Some(literal) => match literal.strip_prefix('@') {
            Some(path) => {
                let raw = std::fs::read_to_string(path).with_context(|| format!("reading input file {path}"))?;
                serde_json::from_str(&raw).context("parsing input file as JSON")
            }
            None => serde_json::from_str(literal).context("parsing --input as JSON"),
        },
    }
}

fn default_registry() -> HandlerRegistry {
    let registry = HandlerRegistry::new();
    registry.register(NodeType::Echo, Arc::new(EchoHandler) as Arc<dyn NodeHandler>);
    registry
}

async fn run(workflow: PathBuf, input: Option<String>, max_concurrent: Option<usize>, safety: bool) -> Result<()> {
    let definition = load_workflow_definition(&workflow)?;
    let trigger_input = load_trigger_input(input.as_deref())?;

    let built = loomwork_engine::build(&definition).map_err(|err| anyhow::anyhow!("{err}"))?;
    tracing::info!(workflow = %definition.name, nodes = built.len(), "workflow compiled");

    let registry = default_registry();
    let mut options = ExecutionOptions::new()
        .with_default_retry_policy(RetryPolicy::none())
        .with_cancel_token(tokio_util::sync::CancellationToken::new());
    if let Some(n) = max_concurrent {
        options = options.with_max_concurrent_nodes(n);
    }
    if safety {
        let mut config = SafetyConfig::disabled();
        config.enable_pii_detection = true;
        config.pii_redaction_enabled = true;
        config.enable_prompt_injection_detection = true;
        config.enable_content_moderation = true;
        options = options.with_safety_config(config);
    }

    let result = loomwork_engine::execute(&built, trigger_input, definition.variables.clone(), &registry, &options, &Hooks::default())
        .await
        .map_err(|err| anyhow::anyhow!("{err}"))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn validate(workflow: PathBuf) -> Result<()> {
    let definition = load_workflow_definition(&workflow)?;
    match loomwork_engine::build(&definition) {
        Ok(built) => {
            println!("ok: {} nodes, {} execution levels", built.len(), built.execution_levels.len());
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::load(cli.config.as_deref())?;
    let log_format = cli.log_format.unwrap_or(app_config.log_format);
    logging::init(log_format, &app_config.log_level);

    match cli.command {
        Command::Run { workflow, input, max_concurrent, safety } => run(workflow, input, max_concurrent, safety).await,
        Command::Validate { workflow } => validate(workflow),
    }
}
