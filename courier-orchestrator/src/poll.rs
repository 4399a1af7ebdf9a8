//! Outstanding-job polling
//!
//! One `run()` executes to completion per scheduler tick. The outstanding
//! set is partitioned by ledger table; each table is opened once, each job
//! gets one status request, and the response is classified into a ledger
//! write-back plus a keep-or-drop decision for the outstanding set.
//!
//! Failure policy is fail-open: a table that cannot be opened keeps all of
//! its jobs outstanding, a transport error marks the row `DownloadError`
//! and retries next tick, and a job leaves the outstanding set only after
//! its terminal write-back succeeded.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use courier_core::domain::job::JobStatus;
use courier_core::dto::worker::{PollOutcome, ResultPayload};

use crate::gateway::WorkerGateway;
use crate::ledger::{Column, Ledger, RowPatch};
use crate::materialize::ResultMaterializer;
use crate::state::{OutstandingEntry, OutstandingSet, StateStore};

/// Local marker shown while a status request itself keeps failing; says
/// nothing about the remote job
const DOWNLOAD_ERROR: &str = "DownloadError";

/// Summary of one poll run
#[derive(Debug, Clone, Copy, Default)]
pub struct PollReport {
    /// Jobs that received a status request this run
    pub polled: usize,
    /// Jobs that reached `Complete` and were written back
    pub completed: usize,
    /// Jobs that reached `Failed` or `DecodeError` and were written back
    pub failed: usize,
    /// Jobs hit by a transport/parse error (retried next run)
    pub transient: usize,
    /// Tables skipped wholesale because they could not be opened
    pub tables_skipped: usize,
    /// Jobs still outstanding after this run
    pub still_outstanding: usize,
}

/// Per-job decision after classification and write-back
enum JobTick {
    /// Terminal status written back; drop from the outstanding set
    Settled(JobStatus),
    /// Keep polling
    Outstanding { transient: bool },
}

/// Polls every outstanding job and applies the results
pub struct Poller {
    ledger: Arc<dyn Ledger>,
    state: Arc<dyn StateStore>,
    gateway: Arc<dyn WorkerGateway>,
    materializer: ResultMaterializer,
}

impl Poller {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        state: Arc<dyn StateStore>,
        gateway: Arc<dyn WorkerGateway>,
        materializer: ResultMaterializer,
    ) -> Self {
        Self {
            ledger,
            state,
            gateway,
            materializer,
        }
    }

    /// Performs one poll run over the whole outstanding set.
    ///
    /// Never returns an error: every failure mode is absorbed into the
    /// report so the scheduler keeps ticking while jobs remain.
    pub async fn run(&self) -> PollReport {
        let mut report = PollReport::default();

        let mut set = match OutstandingSet::load(self.state.as_ref()) {
            Ok(set) => set,
            Err(e) => {
                error!(error = %e, "cannot load outstanding set; skipping this run");
                // Report one phantom outstanding job so the timer stays armed
                report.still_outstanding = 1;
                return report;
            }
        };

        if set.is_empty() {
            return report;
        }

        for (table, entries) in set.by_table() {
            // Open the table once per run; a failure here must preserve
            // every one of its jobs rather than lose track of them.
            if let Err(e) = self.ledger.read_rows(&table) {
                warn!(
                    table = %table.table_name,
                    jobs = entries.len(),
                    error = %e,
                    "ledger table unavailable, keeping its jobs outstanding"
                );
                report.tables_skipped += 1;
                continue;
            }

            for entry in &entries {
                report.polled += 1;
                match self.poll_one(entry).await {
                    JobTick::Settled(status) => {
                        set.remove(&entry.job_id);
                        match status {
                            JobStatus::Complete => report.completed += 1,
                            _ => report.failed += 1,
                        }
                    }
                    JobTick::Outstanding { transient } => {
                        if transient {
                            report.transient += 1;
                        }
                    }
                }
            }
        }

        report.still_outstanding = set.len();
        if let Err(e) = set.save(self.state.as_ref()) {
            error!(error = %e, "failed to persist outstanding set");
        }

        if report.still_outstanding == 0 {
            info!(
                completed = report.completed,
                failed = report.failed,
                "all jobs settled"
            );
        }

        report
    }

    /// Issues one status request and applies the classified outcome.
    async fn poll_one(&self, entry: &OutstandingEntry) -> JobTick {
        let response = match self.gateway.status(&entry.job_id).await {
            Ok(response) => response,
            Err(e) => {
                debug!(job_id = %entry.job_id, error = %e, "status request failed");
                // Local marker only; the remote job may be fine.
                self.write_display_status(entry, DOWNLOAD_ERROR);
                return JobTick::Outstanding { transient: true };
            }
        };

        let outcome = match response {
            None => PollOutcome::NotReady,
            Some(body) => body.classify(),
        };

        match outcome {
            PollOutcome::NotReady => JobTick::Outstanding { transient: false },
            PollOutcome::InProgress(status) => {
                self.write_display_status(entry, &status);
                JobTick::Outstanding { transient: false }
            }
            PollOutcome::Failed(detail) => {
                let patch = RowPatch::new()
                    .set(Column::Status, format!("Failed: {detail}"))
                    .set(Column::ReceivedAt, Utc::now().to_rfc3339())
                    .expect_job_id(&entry.job_id);
                if self.apply_patch(entry, &patch) {
                    JobTick::Settled(JobStatus::Failed)
                } else {
                    JobTick::Outstanding { transient: true }
                }
            }
            PollOutcome::Complete(payload) => self.settle_complete(entry, payload),
        }
    }

    /// Materializes a completed job and writes the references back.
    fn settle_complete(&self, entry: &OutstandingEntry, payload: ResultPayload) -> JobTick {
        let hint = self.name_hint(entry);
        let stamp = Utc::now().date_naive();

        let (patch, settled_as) = match self.materializer.persist(&hint, &payload, stamp) {
            Ok(outcome) => {
                if outcome.decode_failures > 0 {
                    warn!(
                        job_id = %entry.job_id,
                        failures = outcome.decode_failures,
                        "completed with attachment decode failures"
                    );
                }
                let patch = RowPatch::new()
                    .set(Column::Status, JobStatus::Complete.as_str())
                    .set(Column::ReceivedAt, Utc::now().to_rfc3339())
                    .set(Column::ResultRef, outcome.primary_ref.unwrap_or_default())
                    .set(Column::AttachmentRefs, outcome.attachment_cell())
                    .expect_job_id(&entry.job_id);
                (patch, JobStatus::Complete)
            }
            Err(e) => {
                // The primary payload itself could not be persisted; the
                // job ends terminally rather than re-fetching a result the
                // worker has already handed over.
                warn!(job_id = %entry.job_id, error = %e, "primary payload not materialized");
                let patch = RowPatch::new()
                    .set(Column::Status, format!("DecodeError: {e}"))
                    .set(Column::ReceivedAt, Utc::now().to_rfc3339())
                    .expect_job_id(&entry.job_id);
                (patch, JobStatus::DecodeError)
            }
        };

        if self.apply_patch(entry, &patch) {
            JobTick::Settled(settled_as)
        } else {
            JobTick::Outstanding { transient: true }
        }
    }

    /// Pulls an identifying field from the stored request parameters to
    /// name the materialized objects, falling back to the action.
    fn name_hint(&self, entry: &OutstandingEntry) -> String {
        let params = self
            .ledger
            .read_field(&entry.table, entry.row_index, Column::Params)
            .ok()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok());

        if let Some(params) = params {
            for key in ["document_name", "url", "query"] {
                if let Some(value) = params.get(key).and_then(|v| v.as_str()) {
                    if !value.is_empty() {
                        return value.to_string();
                    }
                }
            }
        }

        entry.action.clone()
    }

    /// Write-back that keeps the record outstanding on failure.
    fn apply_patch(&self, entry: &OutstandingEntry, patch: &RowPatch) -> bool {
        match self.ledger.update(&entry.table, entry.row_index, patch) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    job_id = %entry.job_id,
                    table = %entry.table.table_name,
                    row = entry.row_index,
                    error = %e,
                    "ledger write-back failed, keeping job outstanding"
                );
                false
            }
        }
    }

    /// Best-effort display status; a failure only loses the cosmetic update.
    fn write_display_status(&self, entry: &OutstandingEntry, status: &str) {
        let patch = RowPatch::new()
            .set(Column::Status, status)
            .expect_job_id(&entry.job_id);
        let _ = self.apply_patch(entry, &patch);
    }
}
