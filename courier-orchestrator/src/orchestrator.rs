//! Orchestrator facade
//!
//! Composition root for the engine: wires storage, transport, gate,
//! submitter, poller, and scheduler together and exposes the batch-level
//! operations the CLI drives.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use courier_client::{ExchangeTokenProvider, LifecycleClient, WorkerClient};
use courier_core::domain::ledger::LedgerRef;
use courier_core::dto::job::{ActionRequest, SubmissionOutcome};

use crate::config::Config;
use crate::error::{OrchestratorError, Result};
use crate::gateway::{AlwaysRunning, InstanceControl, LifecycleControl, WorkerGateway};
use crate::ledger::{Column, FileLedger, Ledger, LedgerRow};
use crate::lifecycle::RemoteLifecycleGate;
use crate::materialize::{FsObjectStore, ObjectStore, ResultMaterializer};
use crate::poll::{PollReport, Poller};
use crate::scheduler::{POLL_TASK, TimerScheduler};
use crate::state::{
    ACTIVE_BATCH_KEY, FileStateStore, OutstandingEntry, OutstandingSet, StateStore,
};
use crate::submit::JobSubmitter;

/// What one submission batch produced
#[derive(Debug, Clone)]
pub struct BatchReceipt {
    pub table: LedgerRef,
    /// One outcome per request, in request order
    pub outcomes: Vec<SubmissionOutcome>,
    /// Ledger row of each outcome, parallel to `outcomes`
    pub row_indices: Vec<usize>,
}

impl BatchReceipt {
    /// Requests the worker actually accepted
    pub fn submitted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.job_id().is_some()).count()
    }
}

/// The composed client-side engine
pub struct Orchestrator {
    config: Config,
    ledger: Arc<dyn Ledger>,
    state: Arc<dyn StateStore>,
    gate: RemoteLifecycleGate,
    submitter: JobSubmitter,
    poller: Arc<Poller>,
    scheduler: TimerScheduler,
}

impl Orchestrator {
    /// Builds an engine over the real file stores and HTTP clients.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let worker = Arc::new(
            WorkerClient::with_timeout(config.worker_url.clone(), config.request_timeout)
                .map_err(|e| OrchestratorError::Config(format!("HTTP client: {e}")))?,
        );

        let control: Arc<dyn LifecycleControl> = match &config.lifecycle {
            Some(settings) => {
                let tokens = Arc::new(ExchangeTokenProvider::new(
                    settings.token_url.clone(),
                    settings.service_credential.clone(),
                ));
                let client = LifecycleClient::with_timeout(
                    settings.control_url.clone(),
                    tokens,
                    config.request_timeout,
                )
                .map_err(|e| OrchestratorError::Config(format!("HTTP client: {e}")))?;
                Arc::new(InstanceControl::new(client, settings.instance.clone()))
            }
            None => Arc::new(AlwaysRunning),
        };

        let ledger: Arc<dyn Ledger> = Arc::new(FileLedger::new(config.data_dir.join("ledger")));
        let state: Arc<dyn StateStore> =
            Arc::new(FileStateStore::new(config.data_dir.join("state.json")));
        let objects: Arc<dyn ObjectStore> =
            Arc::new(FsObjectStore::new(config.data_dir.join("objects")));

        Ok(Self::with_parts(config, ledger, state, objects, worker, control))
    }

    /// Builds an engine over injected storage and transport seams.
    pub fn with_parts(
        config: Config,
        ledger: Arc<dyn Ledger>,
        state: Arc<dyn StateStore>,
        objects: Arc<dyn ObjectStore>,
        worker: Arc<dyn WorkerGateway>,
        control: Arc<dyn LifecycleControl>,
    ) -> Self {
        let gate = RemoteLifecycleGate::new(control, config.boot_delay);
        let submitter = JobSubmitter::new(Arc::clone(&worker));
        let poller = Arc::new(Poller::new(
            Arc::clone(&ledger),
            Arc::clone(&state),
            worker,
            ResultMaterializer::new(objects),
        ));
        let scheduler = TimerScheduler::new(Arc::clone(&state));

        Self {
            config,
            ledger,
            state,
            gate,
            submitter,
            poller,
            scheduler,
        }
    }

    /// Submits a batch of jobs into the named ledger table.
    ///
    /// Gate first: a lifecycle failure aborts before anything is written.
    /// Every request then gets exactly one ledger row, accepted jobs enter
    /// the outstanding set, and the poll timer is armed.
    pub async fn submit_batch(
        &self,
        table_name: &str,
        requests: Vec<ActionRequest>,
    ) -> Result<BatchReceipt> {
        if requests.is_empty() {
            return Err(OrchestratorError::Config(
                "submission batch is empty".to_string(),
            ));
        }

        self.gate.ensure().await?;

        let outcomes = self.submitter.submit(&requests).await;

        let table = self.ledger.open_or_create(table_name)?;
        let now = Utc::now();
        let rows: Vec<LedgerRow> = requests
            .iter()
            .zip(&outcomes)
            .map(|(request, outcome)| build_row(request, outcome, &now.to_rfc3339()))
            .collect();
        let row_indices = self.ledger.append(&table, &rows)?;

        let mut set = OutstandingSet::load(self.state.as_ref())?;
        for ((request, outcome), row_index) in requests.iter().zip(&outcomes).zip(&row_indices) {
            if let Some(job_id) = outcome.job_id() {
                set.insert(OutstandingEntry {
                    job_id: job_id.to_string(),
                    table: table.clone(),
                    row_index: *row_index,
                    action: request.action.clone(),
                    submitted_at: now,
                });
            }
        }
        set.save(self.state.as_ref())?;

        let receipt = BatchReceipt {
            table,
            outcomes,
            row_indices,
        };

        if receipt.submitted() > 0 {
            self.state.write(ACTIVE_BATCH_KEY, table_name)?;
            self.arm_poll_timer();
        }

        info!(
            table = table_name,
            submitted = receipt.submitted(),
            failed = receipt.outcomes.len() - receipt.submitted(),
            "batch recorded"
        );

        Ok(receipt)
    }

    /// Re-arms the poll timer from persisted state after a restart.
    ///
    /// Returns whether any jobs were outstanding. An empty set also clears
    /// any stale batch marker left behind by an interrupted session.
    pub fn resume(&self) -> Result<bool> {
        let set = OutstandingSet::load(self.state.as_ref())?;
        if set.is_empty() {
            self.scheduler.cancel_if_empty(POLL_TASK)?;
            return Ok(false);
        }

        info!(jobs = set.len(), "resuming polling for outstanding jobs");
        self.arm_poll_timer();
        Ok(true)
    }

    /// Runs a single poll tick synchronously (no timer involved).
    pub async fn poll_once(&self) -> PollReport {
        let report = self.poller.run().await;
        if report.still_outstanding == 0 {
            let _ = self.scheduler.cancel_if_empty(POLL_TASK);
        }
        report
    }

    /// Blocks until the poll timer retires (outstanding set drained).
    pub async fn drain(&self) {
        self.scheduler.join(POLL_TASK).await;
    }

    /// Deletes ledger rows and renumbers the outstanding set in one step.
    ///
    /// Rows are removed highest-to-lowest; for each removed row the
    /// outstanding entry at that position (if any) is dropped and entries
    /// above it shift down by one. Returns how many rows were deleted.
    pub fn clear_rows(&self, table_name: &str, row_indices: &[usize]) -> Result<usize> {
        let table = self.ledger.open(table_name)?;
        let deleted = self.ledger.delete(&table, row_indices)?;

        let mut set = OutstandingSet::load(self.state.as_ref())?;
        for &row_index in &deleted {
            set.renumber_after_delete(&table.table_id, row_index);
        }
        set.save(self.state.as_ref())?;

        // Dropping the last outstanding job retires the timer too
        self.scheduler.cancel_if_empty(POLL_TASK)?;

        Ok(deleted.len())
    }

    /// All data rows of a ledger table, for display.
    pub fn table_rows(&self, table_name: &str) -> Result<Vec<LedgerRow>> {
        let table = self.ledger.open(table_name)?;
        Ok(self.ledger.read_rows(&table)?)
    }

    /// Snapshot of the outstanding set.
    pub fn outstanding(&self) -> Result<OutstandingSet> {
        Ok(OutstandingSet::load(self.state.as_ref())?)
    }

    /// Whether the poll timer is currently armed.
    pub fn polling_active(&self) -> bool {
        self.scheduler.is_active(POLL_TASK)
    }

    fn arm_poll_timer(&self) {
        let poller = Arc::clone(&self.poller);
        self.scheduler
            .ensure(POLL_TASK, self.config.poll_interval, move || {
                let poller = Arc::clone(&poller);
                async move { poller.run().await.still_outstanding > 0 }
            });
    }
}

/// Builds the ledger row for one submission outcome.
fn build_row(request: &ActionRequest, outcome: &SubmissionOutcome, sent_at: &str) -> LedgerRow {
    let mut row = vec![String::new(); Column::ALL.len()];
    row[Column::SentAt.index()] = sent_at.to_string();
    row[Column::Action.index()] = request.action.clone();
    row[Column::Params.index()] =
        serde_json::to_string(&request.params).unwrap_or_else(|_| "null".to_string());

    match outcome {
        SubmissionOutcome::Submitted { job_id } => {
            row[Column::JobId.index()] = job_id.clone();
            row[Column::Status.index()] = "Submitted".to_string();
        }
        SubmissionOutcome::SubmitFailed { reason } => {
            row[Column::Status.index()] = format!("SubmitFailed: {reason}");
        }
    }

    row
}
