//! Local-invocation entry point (A4): reads an event from a file (or stdin)
//! and drives one pipeline stage against live AWS collaborators. Production
//! deployments wire the same [`starfleet_core`] functions to a runtime
//! trigger instead of this binary; it exists for local testing and
//! break-glass re-drives.

use std::io::Read as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use starfleet_core::alert::WebhookAlertSink;
use starfleet_core::clients::aws::{S3ObjectStore, SqsQueueClient};
use starfleet_core::config::ConfigStore;
use starfleet_core::context::StarfleetContext;
use starfleet_core::index::AccountIndex;
use starfleet_core::model::{StoreChangeEvent, TimedEvent};
use starfleet_core::registry::{WorkerPlugin, WorkerRegistry};
use starfleet_core::{dispatch, fanout, logging};

#[derive(Parser)]
#[command(name = "starfleet", about = "Local invocation of the tasking pipeline")]
struct Cli {
    /// Directory of YAML configuration fragments.
    #[arg(long, env = "STARFLEET_CONFIG_DIR")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reads a TimedEvent JSON document and runs the dispatcher's timed path.
    DispatchTimed {
        #[arg(long)]
        event_file: Option<PathBuf>,
    },
    /// Reads a StoreChangeEvent JSON document and runs the dispatcher's
    /// store-change path.
    DispatchStoreEvent {
        #[arg(long)]
        event_file: Option<PathBuf>,
    },
    /// Runs the fan-out engine directly against a named worker and template.
    FanOut {
        #[arg(long)]
        worker: String,
        #[arg(long)]
        template_path: String,
    },
}

fn read_input(path: &Option<PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

async fn build_context(config_dir: &PathBuf) -> anyhow::Result<StarfleetContext> {
    let config = ConfigStore::load(config_dir)?;

    let bucket = config.starfleet.template_bucket.clone();
    let index_key = config.starfleet.account_index.clone();
    let object_store: Arc<dyn starfleet_core::clients::ObjectStore> =
        Arc::new(S3ObjectStore::from_env(&config.starfleet.deployment_region).await);
    let snapshot = object_store.get_object(&bucket, &format!("{index_key}.json")).await?;
    let index = AccountIndex::parse_bytes(&snapshot)?;

    let registry = WorkerRegistry::discover(installed_workers(), &config)?;

    let queue_client = Arc::new(SqsQueueClient::from_env(&config.starfleet.deployment_region).await);

    let webhook_url = config
        .worker_section("alerting")
        .and_then(|section| section.get("webhook_url"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(StarfleetContext {
        config,
        registry,
        index,
        object_store,
        queue_client,
        alert_sink: Arc::new(WebhookAlertSink::new(webhook_url)),
    })
}

/// The compiled-in worker catalog. Real deployments register each worker
/// kind they ship here; this binary carries none, so every worker section
/// present in configuration is skipped until one is added.
fn installed_workers() -> Vec<Box<dyn WorkerPlugin>> {
    Vec::new()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let bootstrap_config = ConfigStore::load(&cli.config_dir)?;
    logging::init(&bootstrap_config.starfleet);

    let ctx = build_context(&cli.config_dir).await?;

    let processed = match cli.command {
        Command::DispatchTimed { event_file } => {
            let event: TimedEvent = serde_json::from_str(&read_input(&event_file)?)?;
            dispatch::dispatch_timed(&ctx, &event).await?
        }
        Command::DispatchStoreEvent { event_file } => {
            let event: StoreChangeEvent = serde_json::from_str(&read_input(&event_file)?)?;
            dispatch::dispatch_store_event(&ctx, &event).await?
        }
        Command::FanOut { worker, template_path } => {
            fanout::fan_out(&ctx, &worker, &template_path).await?
        }
    };

    tracing::info!(messages_enqueued = processed, "invocation complete");
    Ok(())
}
