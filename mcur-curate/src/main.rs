//! mcur-curate - Corpus curation command-line tool
//!
//! **Usage:**
//! ```bash
//! mcur-curate validate-config [CONFIG]
//! mcur-curate show-plan [CONFIG]
//! mcur-curate show-default-config
//! mcur-curate list-rules
//! mcur-curate curate <INPUTS> [--config <CONFIG>] [--workers <N>] [--fail-fast]
//! ```
//!
//! Without an explicit config path the `MCUR_CONFIG` environment variable,
//! then `<config dir>/mcur/curation.toml`, then the built-in default is used.
//! Logs go to stderr; command output goes to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcur_curate::config::{self, ConfigSource, CONFIG_ENV_VAR, DEFAULT_CONFIG_TOML};
use mcur_curate::{run_batch_records, CurationPipeline, GateMode, BUILTIN_REGISTRY};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Rule-driven curation for symbolic-music corpora
#[derive(Parser, Debug)]
#[clap(name = "mcur-curate", version)]
struct Args {
    /// Log filter (e.g. "debug", "mcur_curate=trace"); overrides RUST_LOG
    #[clap(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a configuration and report the plan size
    ValidateConfig {
        /// Configuration file (.toml or .json)
        config: Option<PathBuf>,
    },

    /// Print the resolved plan steps as JSON
    ShowPlan {
        /// Configuration file (.toml or .json)
        config: Option<PathBuf>,
    },

    /// Print the built-in default configuration
    ShowDefaultConfig,

    /// List registered rules and their parameters as JSON
    ListRules,

    /// Curate a JSON array of inputs and print the batch report
    Curate {
        /// JSON file holding an array of {notes, end_time?, context?}
        inputs: PathBuf,

        /// Configuration file (.toml or .json)
        #[clap(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Worker threads (defaults to available parallelism)
        #[clap(long)]
        workers: Option<usize>,

        /// Stop evaluating a sequence at its first failing test
        #[clap(long)]
        fail_fast: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log filter '{}'", level))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting mcur-curate v{} ({} rules registered)",
        env!("CARGO_PKG_VERSION"),
        BUILTIN_REGISTRY.len()
    );

    match args.command {
        Command::ValidateConfig { config } => {
            let (source, plan) = load_plan(config.as_deref())?;
            println!(
                "{}: OK ({} tests, {} pre-processing, {} metadata)",
                source,
                plan.tests.len(),
                plan.pre_processing.len(),
                plan.metadata.len()
            );
        }
        Command::ShowPlan { config } => {
            let (_, plan) = load_plan(config.as_deref())?;
            let steps = serde_json::json!({
                "steps": plan.steps(),
                "manual": plan.vocabulary,
                "guidance": plan.guidance,
            });
            println!("{}", serde_json::to_string_pretty(&steps)?);
        }
        Command::ShowDefaultConfig => {
            print!("{}", DEFAULT_CONFIG_TOML);
        }
        Command::ListRules => {
            println!("{}", serde_json::to_string_pretty(&BUILTIN_REGISTRY.describe())?);
        }
        Command::Curate {
            inputs,
            config,
            workers,
            fail_fast,
        } => {
            let (_, plan) = load_plan(config.as_deref())?;
            let text = std::fs::read_to_string(&inputs)
                .with_context(|| format!("Failed to read inputs from {}", inputs.display()))?;
            // records are decoded one by one so a bad record only excludes itself
            let records: Vec<serde_json::Value> =
                serde_json::from_str(&text).context("Inputs must be a JSON array of sequences")?;

            let mode = if fail_fast {
                GateMode::FailFast
            } else {
                GateMode::Exhaustive
            };
            let workers = workers.unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });

            let pipeline = CurationPipeline::new(Arc::new(plan)).with_mode(mode);
            let report = run_batch_records(pipeline, records, workers);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Locate, load and resolve the configuration
fn load_plan(cli_path: Option<&Path>) -> Result<(ConfigSource, config::ExecutionPlan)> {
    let source = config::resolve_config_source(cli_path, CONFIG_ENV_VAR);
    info!("Using configuration: {}", source);

    let document = source
        .load()
        .with_context(|| format!("Failed to load configuration from {}", source))?;
    let plan = config::resolve_builtin(&document)
        .with_context(|| format!("Invalid configuration in {}", source))?;
    Ok((source, plan))
}
