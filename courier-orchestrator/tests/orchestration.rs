//! End-to-end orchestration scenarios
//!
//! Drives the composed engine over real file-backed stores and a scripted
//! worker gateway: submit batches, poll, delete rows, and verify the
//! ledger and outstanding set move together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use courier_client::ClientError;
use courier_core::dto::job::{ActionRequest, SubmitAck, SubmissionOutcome};
use courier_core::dto::worker::PollResponse;
use courier_orchestrator::gateway::{AlwaysRunning, LifecycleControl, WorkerGateway};
use courier_orchestrator::ledger::{Column, FileLedger, Ledger};
use courier_orchestrator::materialize::{FsObjectStore, ObjectStore};
use courier_orchestrator::state::{ACTIVE_BATCH_KEY, FileStateStore, StateStore};
use courier_orchestrator::{Config, Orchestrator, OrchestratorError};
use tempfile::TempDir;

/// Worker double: accepts everything except action "reject", assigns
/// sequential job ids, and answers polls from a scripted status map.
#[derive(Default)]
struct ScriptedWorker {
    next_id: Mutex<usize>,
    statuses: Mutex<HashMap<String, serde_json::Value>>,
}

impl ScriptedWorker {
    fn set_status(&self, job_id: &str, status: serde_json::Value) {
        self.statuses
            .lock()
            .unwrap()
            .insert(job_id.to_string(), status);
    }
}

#[async_trait]
impl WorkerGateway for ScriptedWorker {
    async fn submit(&self, request: &ActionRequest) -> courier_client::Result<SubmitAck> {
        if request.action == "reject" {
            return Ok(serde_json::from_str(r#"{"status":"error"}"#).unwrap());
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(serde_json::from_value(serde_json::json!({
            "status": "received",
            "job_id": format!("job-{next}", next = *next),
        }))
        .unwrap())
    }

    async fn status(&self, job_id: &str) -> courier_client::Result<Option<PollResponse>> {
        match self.statuses.lock().unwrap().get(job_id) {
            None => Ok(None),
            Some(value) if value == "transport-error" => {
                Err(ClientError::ParseError("connection reset".to_string()))
            }
            Some(value) => Ok(Some(serde_json::from_value(value.clone()).unwrap())),
        }
    }
}

/// Control double whose status call always fails
struct UnreachableControl;

#[async_trait]
impl LifecycleControl for UnreachableControl {
    async fn status(&self) -> courier_client::Result<courier_core::dto::lifecycle::InstanceStatus> {
        Err(ClientError::AuthFailed("token exchange refused".to_string()))
    }

    async fn start(&self) -> courier_client::Result<()> {
        Ok(())
    }
}

struct Harness {
    dir: TempDir,
    worker: Arc<ScriptedWorker>,
    state: Arc<FileStateStore>,
    orchestrator: Orchestrator,
}

fn harness_with_control(control: Arc<dyn LifecycleControl>) -> Harness {
    let dir = TempDir::new().unwrap();

    let mut config = Config::new("http://worker.test:5000", dir.path());
    config.boot_delay = Duration::ZERO;
    // Keep the recurring timer out of the way; tests drive poll_once.
    config.poll_interval = Duration::from_secs(3600);

    let worker = Arc::new(ScriptedWorker::default());
    let state = Arc::new(FileStateStore::new(dir.path().join("state.json")));
    let ledger: Arc<dyn Ledger> = Arc::new(FileLedger::new(dir.path().join("ledger")));
    let objects: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(dir.path().join("objects")));

    let orchestrator = Orchestrator::with_parts(
        config,
        ledger,
        Arc::clone(&state) as Arc<dyn StateStore>,
        objects,
        Arc::clone(&worker) as Arc<dyn WorkerGateway>,
        control,
    );

    Harness {
        dir,
        worker,
        state,
        orchestrator,
    }
}

fn harness() -> Harness {
    harness_with_control(Arc::new(AlwaysRunning))
}

fn request(action: &str, params: serde_json::Value) -> ActionRequest {
    ActionRequest::new(action, params)
}

/// Lets the timer's immediate first tick run while no statuses are
/// scripted, so manual poll_once calls stay deterministic.
async fn settle_timer() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

fn cell(rows: &[Vec<String>], row: usize, column: Column) -> String {
    rows[row - 1][column.index()].clone()
}

#[tokio::test]
async fn submit_two_then_poll_one_complete_one_pending() {
    let h = harness();

    let receipt = h
        .orchestrator
        .submit_batch(
            "batch-1",
            vec![
                request("full_recursive_download", serde_json::json!({"url": "https://a.test"})),
                request("full_recursive_download", serde_json::json!({"url": "https://b.test"})),
            ],
        )
        .await
        .unwrap();

    assert_eq!(receipt.row_indices, vec![1, 2]);
    assert_eq!(receipt.submitted(), 2);
    assert!(h.orchestrator.polling_active());
    settle_timer().await;

    let rows = h.orchestrator.table_rows("batch-1").unwrap();
    assert_eq!(cell(&rows, 1, Column::Status), "Submitted");
    assert_eq!(cell(&rows, 2, Column::Status), "Submitted");

    h.worker.set_status(
        "job-1",
        serde_json::json!({"status": "complete", "result": {"text": "page body"}}),
    );
    h.worker
        .set_status("job-2", serde_json::json!({"status": "Pending"}));

    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.polled, 2);
    assert_eq!(report.completed, 1);
    assert_eq!(report.still_outstanding, 1);

    let rows = h.orchestrator.table_rows("batch-1").unwrap();
    assert_eq!(cell(&rows, 1, Column::Status), "Complete");
    assert!(!cell(&rows, 1, Column::ResultRef).is_empty());
    // In-progress status is shown verbatim while the record stays polling
    assert_eq!(cell(&rows, 2, Column::Status), "Pending");

    let outstanding = h.orchestrator.outstanding().unwrap();
    assert_eq!(outstanding.len(), 1);
    assert!(outstanding.get("job-2").is_some());
}

#[tokio::test]
async fn submit_failure_is_isolated_and_still_gets_a_row() {
    let h = harness();

    let receipt = h
        .orchestrator
        .submit_batch(
            "batch-1",
            vec![
                request("download", serde_json::json!({})),
                request("reject", serde_json::json!({})),
                request("download", serde_json::json!({})),
            ],
        )
        .await
        .unwrap();

    assert_eq!(receipt.row_indices, vec![1, 2, 3]);
    assert_eq!(receipt.submitted(), 2);
    assert!(matches!(
        receipt.outcomes[1],
        SubmissionOutcome::SubmitFailed { .. }
    ));

    let rows = h.orchestrator.table_rows("batch-1").unwrap();
    assert!(cell(&rows, 2, Column::Status).starts_with("SubmitFailed"));
    assert_eq!(cell(&rows, 2, Column::JobId), "");

    // Only the accepted jobs are outstanding
    assert_eq!(h.orchestrator.outstanding().unwrap().len(), 2);
}

#[tokio::test]
async fn lifecycle_failure_aborts_before_any_ledger_write() {
    let h = harness_with_control(Arc::new(UnreachableControl));

    let result = h
        .orchestrator
        .submit_batch("batch-1", vec![request("download", serde_json::json!({}))])
        .await;

    assert!(matches!(result, Err(OrchestratorError::Lifecycle(_))));
    assert!(h.orchestrator.table_rows("batch-1").is_err());
    assert!(h.orchestrator.outstanding().unwrap().is_empty());
    assert!(!h.orchestrator.polling_active());
}

#[tokio::test]
async fn deleting_a_row_renumbers_the_outstanding_set() {
    let h = harness();

    h.orchestrator
        .submit_batch(
            "batch-1",
            vec![
                request("download", serde_json::json!({})),
                request("download", serde_json::json!({})),
                request("download", serde_json::json!({})),
            ],
        )
        .await
        .unwrap();
    settle_timer().await;

    let deleted = h.orchestrator.clear_rows("batch-1", &[2]).unwrap();
    assert_eq!(deleted, 1);

    let rows = h.orchestrator.table_rows("batch-1").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(cell(&rows, 1, Column::JobId), "job-1");
    assert_eq!(cell(&rows, 2, Column::JobId), "job-3");

    let outstanding = h.orchestrator.outstanding().unwrap();
    assert_eq!(outstanding.len(), 2);
    assert_eq!(outstanding.get("job-1").unwrap().row_index, 1);
    // The entry formerly at row 3 now reports row 2
    assert_eq!(outstanding.get("job-3").unwrap().row_index, 2);
}

#[tokio::test]
async fn unreadable_table_keeps_its_jobs_while_others_settle() {
    let h = harness();

    let receipt_a = h
        .orchestrator
        .submit_batch("batch-a", vec![request("download", serde_json::json!({}))])
        .await
        .unwrap();
    let receipt_b = h
        .orchestrator
        .submit_batch("batch-b", vec![request("download", serde_json::json!({}))])
        .await
        .unwrap();
    settle_timer().await;

    let job_a = receipt_a.outcomes[0].job_id().unwrap().to_string();
    let job_b = receipt_b.outcomes[0].job_id().unwrap().to_string();

    h.worker.set_status(
        &job_a,
        serde_json::json!({"status": "complete", "result": {"text": "done"}}),
    );
    h.worker.set_status(
        &job_b,
        serde_json::json!({"status": "complete", "result": {"text": "done"}}),
    );

    // Corrupt table B so the poller cannot open it
    std::fs::write(h.dir.path().join("ledger").join("batch-b.json"), "garbage").unwrap();

    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.tables_skipped, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.still_outstanding, 1);

    // Table A settled normally...
    let rows = h.orchestrator.table_rows("batch-a").unwrap();
    assert_eq!(cell(&rows, 1, Column::Status), "Complete");

    // ...and table B's job was preserved, not dropped
    let outstanding = h.orchestrator.outstanding().unwrap();
    assert!(outstanding.get(&job_a).is_none());
    assert!(outstanding.get(&job_b).is_some());
}

#[tokio::test]
async fn transport_error_marks_the_row_and_retries() {
    let h = harness();

    h.orchestrator
        .submit_batch("batch-1", vec![request("download", serde_json::json!({}))])
        .await
        .unwrap();
    settle_timer().await;

    h.worker
        .set_status("job-1", serde_json::json!("transport-error"));

    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.transient, 1);
    assert_eq!(report.still_outstanding, 1);

    let rows = h.orchestrator.table_rows("batch-1").unwrap();
    // Local marker only; the remote job did not fail
    assert_eq!(cell(&rows, 1, Column::Status), "DownloadError");

    // The next run can still settle the job
    h.worker.set_status(
        "job-1",
        serde_json::json!({"status": "complete", "result": {"text": "late"}}),
    );
    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.completed, 1);
    assert_eq!(report.still_outstanding, 0);
}

#[tokio::test]
async fn failed_job_records_the_worker_detail() {
    let h = harness();

    h.orchestrator
        .submit_batch("batch-1", vec![request("download", serde_json::json!({}))])
        .await
        .unwrap();
    settle_timer().await;

    h.worker.set_status(
        "job-1",
        serde_json::json!({"status": "failed", "error": "action 'download' crashed"}),
    );

    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.still_outstanding, 0);

    let rows = h.orchestrator.table_rows("batch-1").unwrap();
    assert_eq!(
        cell(&rows, 1, Column::Status),
        "Failed: action 'download' crashed"
    );
    assert!(h.orchestrator.outstanding().unwrap().is_empty());
}

#[tokio::test]
async fn attachment_decode_failure_leaves_the_job_complete() {
    let h = harness();

    h.orchestrator
        .submit_batch(
            "batch-1",
            vec![request(
                "docsend_scraping",
                serde_json::json!({"document_name": "deck"}),
            )],
        )
        .await
        .unwrap();
    settle_timer().await;

    let good = base64::engine::general_purpose::STANDARD.encode(b"pdf bytes");
    h.worker.set_status(
        "job-1",
        serde_json::json!({
            "status": "complete",
            "result": {
                "downloaded_files": [
                    {"filename": "deck.pdf", "content_base64": good},
                    {"filename": "broken.bin", "content_base64": "!!not-base64!!"},
                ],
            },
        }),
    );

    let report = h.orchestrator.poll_once().await;
    assert_eq!(report.completed, 1);

    let rows = h.orchestrator.table_rows("batch-1").unwrap();
    assert_eq!(cell(&rows, 1, Column::Status), "Complete");
    let attachments = cell(&rows, 1, Column::AttachmentRefs);
    assert!(attachments.contains("deck.pdf"));
    assert!(attachments.contains("decode-error:broken.bin"));

    // Drained set also clears the batch marker
    assert!(h.orchestrator.outstanding().unwrap().is_empty());
    assert!(h.state.read(ACTIVE_BATCH_KEY).unwrap().is_none());
}

#[tokio::test]
async fn resume_rearms_polling_from_persisted_state() {
    let h = harness();

    h.orchestrator
        .submit_batch("batch-1", vec![request("download", serde_json::json!({}))])
        .await
        .unwrap();
    settle_timer().await;

    // A fresh engine over the same data directory picks the work back up
    let mut config = Config::new("http://worker.test:5000", h.dir.path());
    config.poll_interval = Duration::from_secs(3600);
    let restarted = Orchestrator::with_parts(
        config,
        Arc::new(FileLedger::new(h.dir.path().join("ledger"))),
        Arc::clone(&h.state) as Arc<dyn StateStore>,
        Arc::new(FsObjectStore::new(h.dir.path().join("objects"))),
        Arc::clone(&h.worker) as Arc<dyn WorkerGateway>,
        Arc::new(AlwaysRunning),
    );

    assert!(restarted.resume().unwrap());
    assert!(restarted.polling_active());

    // Nothing outstanding -> resume declines and leaves no timer
    h.worker.set_status(
        "job-1",
        serde_json::json!({"status": "complete", "result": {"text": "done"}}),
    );
    let report = restarted.poll_once().await;
    assert_eq!(report.still_outstanding, 0);
    assert!(!restarted.resume().unwrap());
}
