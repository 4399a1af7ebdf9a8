//! Worker status and result DTOs
//!
//! Shapes returned by `GET /outbound?job_id=` and the message-inspection
//! endpoints. The status field drives classification; everything else is
//! preserved opaquely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw response body from a status poll
///
/// An empty HTTP body (no JSON at all) is also a valid "not ready" signal;
/// the client layer maps that to the absence of a `PollResponse`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<ResultPayload>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Boundary classification of a poll response
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No usable status yet; keep the job outstanding
    NotReady,
    /// Worker reported an in-progress status; stored verbatim for display
    InProgress(String),
    /// Job finished; payload ready for materialization
    Complete(ResultPayload),
    /// Worker reported the job failed, with its error detail
    Failed(String),
}

impl PollResponse {
    /// Classifies the response.
    ///
    /// `complete` and `failed` are matched case-insensitively because the
    /// worker's queue layer capitalizes statuses while its actions do not.
    pub fn classify(self) -> PollOutcome {
        let status = match self.status {
            Some(ref s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return PollOutcome::NotReady,
        };

        if status.eq_ignore_ascii_case("complete") {
            PollOutcome::Complete(self.result.unwrap_or_default())
        } else if status.eq_ignore_ascii_case("failed") {
            let detail = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "worker reported failure without detail".to_string());
            PollOutcome::Failed(detail)
        } else {
            PollOutcome::InProgress(status)
        }
    }
}

/// Primary result payload of a completed job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub downloaded_files: Vec<DownloadedFile>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One embedded binary attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub filename: String,
    #[serde(default)]
    pub content_base64: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Per-stage listing from `GET /messages`
///
/// Keys are queue stages (inbound, processing, ...); values are the raw
/// message objects, each at least carrying a `filename`.
pub type MessageInventory = BTreeMap<String, Vec<serde_json::Value>>;

/// Acknowledgement from `POST /messages/clear`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearMessagesAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub cleared_messages: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_complete_is_case_insensitive() {
        let resp: PollResponse =
            serde_json::from_str(r#"{"status":"Complete","result":{"text":"hi"}}"#).unwrap();
        match resp.classify() {
            PollOutcome::Complete(payload) => assert_eq!(payload.text.as_deref(), Some("hi")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn classify_failed_carries_detail() {
        let resp: PollResponse =
            serde_json::from_str(r#"{"status":"failed","error":"boom"}"#).unwrap();
        assert_eq!(resp.classify(), PollOutcome::Failed("boom".to_string()));
    }

    #[test]
    fn classify_other_status_is_verbatim() {
        let resp: PollResponse = serde_json::from_str(r#"{"status":"Pending"}"#).unwrap();
        assert_eq!(resp.classify(), PollOutcome::InProgress("Pending".to_string()));
    }

    #[test]
    fn classify_missing_or_blank_status_is_not_ready() {
        let resp: PollResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(resp.classify(), PollOutcome::NotReady);

        let resp: PollResponse = serde_json::from_str(r#"{"status":"  "}"#).unwrap();
        assert_eq!(resp.classify(), PollOutcome::NotReady);
    }

    #[test]
    fn payload_keeps_unknown_result_fields() {
        let resp: PollResponse = serde_json::from_str(
            r#"{"status":"complete","result":{"articles":[1,2],"text":"t"}}"#,
        )
        .unwrap();
        match resp.classify() {
            PollOutcome::Complete(payload) => {
                assert!(payload.extra.contains_key("articles"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
