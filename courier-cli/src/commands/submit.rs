//! Submit command handler

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use courier_core::dto::job::{ActionRequest, SubmissionOutcome};
use courier_orchestrator::{Config, Orchestrator};

/// Arguments for `courier submit`
#[derive(Args)]
pub struct SubmitArgs {
    /// Ledger table receiving this batch
    #[arg(long)]
    pub table: String,

    /// Action name for a single-job submission
    #[arg(long, conflicts_with = "batch")]
    pub action: Option<String>,

    /// JSON parameters for the single job
    #[arg(long, default_value = "{}", conflicts_with = "batch")]
    pub params: String,

    /// JSON file holding an array of {action, params} requests
    #[arg(long)]
    pub batch: Option<std::path::PathBuf>,

    /// Stay in the foreground until every job settles
    #[arg(long)]
    pub watch: bool,
}

/// Handle the submit command
pub async fn handle_submit(args: SubmitArgs, config: &Config) -> Result<()> {
    let requests = load_requests(&args)?;
    let orchestrator = Orchestrator::new(config.clone())?;

    let receipt = orchestrator.submit_batch(&args.table, requests).await?;

    println!(
        "{}",
        format!(
            "Recorded {} job(s) in '{}' ({} accepted):",
            receipt.outcomes.len(),
            args.table,
            receipt.submitted()
        )
        .bold()
    );
    for (outcome, row) in receipt.outcomes.iter().zip(&receipt.row_indices) {
        match outcome {
            SubmissionOutcome::Submitted { job_id } => {
                println!("  {} row {}  {}", "✓".green(), row, job_id.dimmed());
            }
            SubmissionOutcome::SubmitFailed { reason } => {
                println!("  {} row {}  {}", "✗".red(), row, reason.red());
            }
        }
    }

    if args.watch && receipt.submitted() > 0 {
        println!();
        println!("{}", "Waiting for jobs to settle...".bold());
        orchestrator.drain().await;
        println!("{}", "All jobs settled.".green());
    }

    Ok(())
}

fn load_requests(args: &SubmitArgs) -> Result<Vec<ActionRequest>> {
    if let Some(path) = &args.batch {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file {}", path.display()))?;
        let requests: Vec<ActionRequest> =
            serde_json::from_str(&raw).context("Batch file is not a JSON array of requests")?;
        if requests.is_empty() {
            bail!("Batch file contains no requests");
        }
        return Ok(requests);
    }

    match &args.action {
        Some(action) => {
            let params =
                serde_json::from_str(&args.params).context("--params is not valid JSON")?;
            Ok(vec![ActionRequest::new(action, params)])
        }
        None => bail!("Provide either --action or --batch"),
    }
}
