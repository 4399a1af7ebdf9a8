//! CLI command definitions and routing

mod ledger;
mod messages;
mod submit;
mod watch;

use anyhow::Result;
use clap::Subcommand;
use courier_orchestrator::Config;

/// Top-level commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a batch of jobs to the worker
    Submit(submit::SubmitArgs),
    /// Poll outstanding jobs until they all settle
    Watch,
    /// Show a ledger table
    Status {
        /// Table name
        table: String,
    },
    /// Delete ledger rows; outstanding entries renumber automatically
    Clear {
        /// Table name
        table: String,

        /// 1-based row indices, comma separated
        #[arg(value_delimiter = ',')]
        rows: Vec<usize>,
    },
    /// Inspect or purge the worker's message queues
    #[command(subcommand)]
    Messages(messages::MessageCommands),
}

/// Routes commands to their handlers
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Submit(args) => submit::handle_submit(args, config).await,
        Commands::Watch => watch::handle_watch(config).await,
        Commands::Status { table } => ledger::handle_status(&table, config),
        Commands::Clear { table, rows } => ledger::handle_clear(&table, &rows, config),
        Commands::Messages(command) => messages::handle_message_command(command, config).await,
    }
}
