//! Worker message-queue commands

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use courier_client::WorkerClient;
use courier_orchestrator::Config;

/// Message subcommands
#[derive(Subcommand)]
pub enum MessageCommands {
    /// List every message in each worker queue stage
    List,
    /// Clear all messages in every stage
    Clear,
}

/// Handle message commands
pub async fn handle_message_command(command: MessageCommands, config: &Config) -> Result<()> {
    let client = WorkerClient::with_timeout(config.worker_url.clone(), config.request_timeout)?;

    match command {
        MessageCommands::List => {
            let inventory = client.list_messages().await?;
            for (stage, messages) in &inventory {
                println!("{}", format!("{} ({})", stage, messages.len()).bold());
                for message in messages {
                    let filename = message
                        .get("filename")
                        .and_then(|v| v.as_str())
                        .unwrap_or("<unnamed>");
                    println!("  {} {}", "▸".cyan(), filename);
                }
            }
        }
        MessageCommands::Clear => {
            let ack = client.clear_messages().await?;
            println!("{}", "Cleared worker queues:".bold());
            for (stage, count) in &ack.cleared_messages {
                println!("  {}: {}", stage, count);
            }
        }
    }

    Ok(())
}
