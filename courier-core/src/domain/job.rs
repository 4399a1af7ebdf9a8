//! Job domain types

use serde::{Deserialize, Serialize};

use crate::domain::ledger::LedgerRef;

/// One tracked job: its identity, ledger location, and status.
///
/// Structure shared between the submitter (creates), the poller (mutates)
/// and ledger maintenance (renumbers or destroys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Worker-assigned identifier; `None` when submission itself failed
    pub job_id: Option<String>,
    /// Which ledger table holds this record
    pub ledger_ref: LedgerRef,
    /// 1-based data row inside the table, excluding the header row
    pub row_index: usize,
    /// Action name submitted to the worker
    pub action: String,
    /// Opaque request parameters, preserved verbatim
    pub params: serde_json::Value,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub status: JobStatus,
    /// Object-store reference of the materialized primary payload
    pub result_ref: Option<String>,
}

/// Job tracking status
///
/// `Submitted` and `Polling` are intermediate and drive continued polling;
/// everything else is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    SubmitFailed,
    Submitted,
    Polling,
    Complete,
    Failed,
    DecodeError,
}

impl JobStatus {
    /// Whether this status ends the job's lifecycle (no further polling).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::SubmitFailed
                | JobStatus::Complete
                | JobStatus::Failed
                | JobStatus::DecodeError
        )
    }

    /// Display label written into the ledger's status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::SubmitFailed => "SubmitFailed",
            JobStatus::Submitted => "Submitted",
            JobStatus::Polling => "Polling",
            JobStatus::Complete => "Complete",
            JobStatus::Failed => "Failed",
            JobStatus::DecodeError => "DecodeError",
        }
    }
}
