//! Courier CLI
//!
//! Command-line interface for driving the Courier orchestrator: submit
//! job batches to the remote worker, watch outstanding jobs settle,
//! inspect and prune ledger tables, and manage the worker's queues.

mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use courier_orchestrator::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Remote worker job orchestration", long_about = None)]
struct Cli {
    /// Worker base URL
    #[arg(
        long,
        env = "COURIER_WORKER_URL",
        default_value = "http://localhost:5000"
    )]
    worker_url: String,

    /// Data directory for the ledger, state, and materialized objects
    #[arg(long, env = "COURIER_DATA_DIR", default_value = "./courier-data")]
    data_dir: std::path::PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    config.worker_url = cli.worker_url;
    config.data_dir = cli.data_dir;
    config.validate()?;

    handle_command(cli.command, &config).await
}
