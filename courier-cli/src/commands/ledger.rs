//! Ledger inspection and maintenance commands

use anyhow::{Result, bail};
use colored::*;
use courier_orchestrator::ledger::Column;
use courier_orchestrator::{Config, Orchestrator};

/// Handle the status command
pub fn handle_status(table: &str, config: &Config) -> Result<()> {
    let orchestrator = Orchestrator::new(config.clone())?;
    let rows = orchestrator.table_rows(table)?;

    if rows.is_empty() {
        println!("{}", format!("Table '{}' is empty.", table).yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} row(s) in '{}':", rows.len(), table).bold()
    );
    println!();
    for (i, row) in rows.iter().enumerate() {
        print_row(i + 1, row);
    }

    Ok(())
}

/// Handle the clear command
pub fn handle_clear(table: &str, rows: &[usize], config: &Config) -> Result<()> {
    if rows.is_empty() {
        bail!("Provide at least one row index");
    }

    let orchestrator = Orchestrator::new(config.clone())?;
    let deleted = orchestrator.clear_rows(table, rows)?;

    println!(
        "{}",
        format!("Deleted {} row(s) from '{}'.", deleted, table).green()
    );

    Ok(())
}

/// Print one ledger row
fn print_row(index: usize, row: &[String]) {
    let job_id = &row[Column::JobId.index()];
    let result_ref = &row[Column::ResultRef.index()];
    let attachments = &row[Column::AttachmentRefs.index()];

    println!("  {} row {}", "▸".cyan(), index);
    println!("    Action:   {}", row[Column::Action.index()]);
    if !job_id.is_empty() {
        println!("    Job:      {}", job_id.dimmed());
    }
    println!("    Sent:     {}", row[Column::SentAt.index()].dimmed());
    println!(
        "    Status:   {}",
        colorize_status(&row[Column::Status.index()])
    );
    if !result_ref.is_empty() {
        println!("    Result:   {}", result_ref);
    }
    if !attachments.is_empty() {
        println!("    Files:    {}", attachments);
    }
    println!();
}

/// Colorize a ledger status cell for display
fn colorize_status(status: &str) -> colored::ColoredString {
    if status == "Complete" {
        status.green()
    } else if status.starts_with("Failed")
        || status.starts_with("SubmitFailed")
        || status.starts_with("DecodeError")
    {
        status.red()
    } else if status == "DownloadError" {
        status.yellow()
    } else {
        status.cyan()
    }
}
