// CLI entry point: direct-invocation execution against local storage, and
// a local ingress smoke-test that exercises the same event parsing as the
// Lambda entrypoint without needing S3/DynamoDB/Lambda to run it.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use iep_config::RuntimeConfig;
use iep_orchestrator::{ExecutionInput, ExecutionOutcome};

/// Turns a scanned IEP PDF into a structured, multilingual, parent-friendly document record.
#[derive(Parser)]
#[command(name = "iep")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error), or an env-filter directive string.
    #[arg(short = 'v', long, global = true, env = "IEP_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single direct-invocation execution against a local on-disk store.
    Ingest(IngestArgs),
    /// Read an ingress event (S3 event or direct-invocation shape) from a file and run it locally.
    ServeIngress(ServeIngressArgs),
}

#[derive(clap::Args)]
struct IngestArgs {
    #[arg(long)]
    iep_id: String,
    #[arg(long)]
    user_id: String,
    #[arg(long)]
    child_id: String,
    #[arg(long)]
    bucket: String,
    #[arg(long)]
    key: String,
    /// Directory for the local filesystem-backed blob store and uploads.
    #[arg(long, default_value = "./iep-local-data")]
    local_dir: PathBuf,
}

#[derive(clap::Args)]
struct ServeIngressArgs {
    /// Path to a JSON file containing an S3 event envelope or a direct-invocation payload.
    #[arg(long)]
    event_file: PathBuf,
    #[arg(long, default_value = "./iep-local-data")]
    local_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    iep::init_tracing(&cli.log_level);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    let config = RuntimeConfig::load().unwrap_or_default();

    match cli.command {
        Commands::Ingest(args) => run_ingest(&config, args).await,
        Commands::ServeIngress(args) => run_serve_ingress(&config, args).await,
    }
}

fn report_outcome(iep_id: &str, outcome: &ExecutionOutcome) -> anyhow::Result<()> {
    match outcome {
        ExecutionOutcome::Processed => {
            println!("{iep_id}: processed");
            Ok(())
        }
        ExecutionOutcome::Failed { step, message } => {
            println!("{iep_id}: failed at {step}: {message}");
            anyhow::bail!("execution for {iep_id} failed at step '{step}'")
        }
    }
}

async fn run_ingest(config: &RuntimeConfig, args: IngestArgs) -> anyhow::Result<()> {
    let step_context = iep::build_local_step_context(config, &args.local_dir).await?;
    let input = ExecutionInput {
        iep_id: args.iep_id.clone(),
        child_id: args.child_id,
        user_id: args.user_id,
        bucket: args.bucket,
        source_key: args.key,
    };
    let outcome = iep_orchestrator::run(&step_context, input).await?;
    report_outcome(&args.iep_id, &outcome)
}

async fn run_serve_ingress(config: &RuntimeConfig, args: ServeIngressArgs) -> anyhow::Result<()> {
    let raw_event = std::fs::read_to_string(&args.event_file)
        .with_context(|| format!("failed to read {}", args.event_file.display()))?;
    let event: serde_json::Value = serde_json::from_str(&raw_event).context("event file is not valid JSON")?;

    let step_context = iep::build_local_step_context(config, &args.local_dir).await?;
    let uploads = iep_lambda::parse_ingress_event(&event)?;
    let dedupe = Mutex::new(HashSet::new());
    let correlation_id = uuid::Uuid::new_v4().to_string();

    let mut any_failed = false;
    for upload in uploads {
        if let Some((iep_id, outcome)) =
            iep_lambda::process_upload(&step_context, &dedupe, upload, &correlation_id).await?
        {
            if report_outcome(&iep_id, &outcome).is_err() {
                any_failed = true;
            }
        }
    }

    if any_failed {
        anyhow::bail!("one or more executions failed");
    }
    Ok(())
}
