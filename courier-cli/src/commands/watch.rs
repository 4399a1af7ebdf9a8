//! Watch command handler
//!
//! Resumes polling from persisted state and stays in the foreground until
//! the outstanding set drains — the recovery path after a crash or an
//! interrupted `submit --watch`.

use anyhow::Result;
use colored::*;
use courier_orchestrator::{Config, Orchestrator};

/// Handle the watch command
pub async fn handle_watch(config: &Config) -> Result<()> {
    let orchestrator = Orchestrator::new(config.clone())?;

    if !orchestrator.resume()? {
        println!("{}", "No outstanding jobs.".yellow());
        return Ok(());
    }

    let outstanding = orchestrator.outstanding()?.len();
    println!(
        "{}",
        format!(
            "Polling {} outstanding job(s) every {:?}...",
            outstanding, config.poll_interval
        )
        .bold()
    );

    orchestrator.drain().await;
    println!("{}", "All jobs settled.".green());

    Ok(())
}
