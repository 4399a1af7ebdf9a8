//! Job submission
//!
//! Posts each request of a batch to the worker and classifies the
//! acknowledgements. A failure for one request never aborts its siblings;
//! every request produces exactly one outcome, in request order.

use std::sync::Arc;

use tracing::{debug, warn};

use courier_core::dto::job::{ActionRequest, SubmissionOutcome};

use crate::gateway::WorkerGateway;

/// Submits batches of action jobs to the worker
pub struct JobSubmitter {
    gateway: Arc<dyn WorkerGateway>,
}

impl JobSubmitter {
    pub fn new(gateway: Arc<dyn WorkerGateway>) -> Self {
        Self { gateway }
    }

    /// Submits every request, returning one outcome per request in order.
    pub async fn submit(&self, batch: &[ActionRequest]) -> Vec<SubmissionOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());

        for request in batch {
            let outcome = match self.gateway.submit(request).await {
                Ok(ack) => match ack.accepted_job_id() {
                    Some(job_id) => {
                        debug!(action = %request.action, job_id, "job accepted by worker");
                        SubmissionOutcome::Submitted {
                            job_id: job_id.to_string(),
                        }
                    }
                    None => SubmissionOutcome::SubmitFailed {
                        reason: format!("malformed acknowledgement (status '{}')", ack.status),
                    },
                },
                Err(e) => {
                    warn!(action = %request.action, error = %e, "job submission failed");
                    SubmissionOutcome::SubmitFailed {
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::dto::job::SubmitAck;
    use courier_core::dto::worker::PollResponse;

    /// Gateway whose acceptance is keyed by action name
    struct ScriptedGateway;

    #[async_trait]
    impl WorkerGateway for ScriptedGateway {
        async fn submit(&self, request: &ActionRequest) -> courier_client::Result<SubmitAck> {
            match request.action.as_str() {
                "transport-error" => Err(courier_client::ClientError::api_error(502, "bad gateway")),
                "bad-shape" => Ok(serde_json::from_str(r#"{"status":"error"}"#).unwrap()),
                action => Ok(serde_json::from_value(serde_json::json!({
                    "status": "received",
                    "job_id": format!("job-{action}"),
                }))
                .unwrap()),
            }
        }

        async fn status(&self, _job_id: &str) -> courier_client::Result<Option<PollResponse>> {
            Ok(None)
        }
    }

    fn request(action: &str) -> ActionRequest {
        ActionRequest::new(action, serde_json::json!({}))
    }

    #[tokio::test]
    async fn outcomes_are_order_preserving_and_isolated() {
        let submitter = JobSubmitter::new(Arc::new(ScriptedGateway));

        let outcomes = submitter
            .submit(&[
                request("alpha"),
                request("transport-error"),
                request("bad-shape"),
                request("omega"),
            ])
            .await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].job_id(), Some("job-alpha"));
        assert!(matches!(
            outcomes[1],
            SubmissionOutcome::SubmitFailed { .. }
        ));
        assert!(matches!(
            outcomes[2],
            SubmissionOutcome::SubmitFailed { .. }
        ));
        assert_eq!(outcomes[3].job_id(), Some("job-omega"));
    }

    #[tokio::test]
    async fn empty_batch_yields_no_outcomes() {
        let submitter = JobSubmitter::new(Arc::new(ScriptedGateway));
        assert!(submitter.submit(&[]).await.is_empty());
    }
}
