//! Job submission DTOs

use serde::{Deserialize, Serialize};

/// Request to run one action on the worker
///
/// `params` is opaque: the orchestrator never relies on its structure,
/// only the worker's action implementation does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }
}

/// Wire acknowledgement from `POST /inbound`
///
/// The worker answers `{status: "received", job_id: "..."}` on success.
/// Any other shape is treated as a failed submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub job_id: Option<String>,
    /// Unknown fields are kept but never relied upon structurally
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SubmitAck {
    /// Returns the job id when the acknowledgement is well formed.
    pub fn accepted_job_id(&self) -> Option<&str> {
        if !self.status.eq_ignore_ascii_case("received") {
            return None;
        }
        self.job_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Per-request submission result, order-preserving within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionOutcome {
    Submitted { job_id: String },
    SubmitFailed { reason: String },
}

impl SubmissionOutcome {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            SubmissionOutcome::Submitted { job_id } => Some(job_id),
            SubmissionOutcome::SubmitFailed { .. } => None,
        }
    }
}
