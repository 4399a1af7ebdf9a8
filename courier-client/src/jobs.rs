//! Job submission and status endpoints

use crate::WorkerClient;
use crate::error::{ClientError, Result};
use courier_core::dto::job::{ActionRequest, SubmitAck};
use courier_core::dto::worker::PollResponse;

impl WorkerClient {
    /// Submit one action job to the worker
    ///
    /// # Arguments
    /// * `request` - The action name and opaque parameters
    ///
    /// # Returns
    /// The worker's acknowledgement. Callers must check
    /// [`SubmitAck::accepted_job_id`] before treating the job as submitted:
    /// a 2xx response with the wrong shape is still a failed submission.
    pub async fn submit_job(&self, request: &ActionRequest) -> Result<SubmitAck> {
        let url = format!("{}/inbound", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;

        self.handle_response(response).await
    }

    /// Poll the status of a previously submitted job
    ///
    /// # Arguments
    /// * `job_id` - The worker-assigned job identifier
    ///
    /// # Returns
    /// `None` when the worker answers with an empty body, which is its
    /// "not ready yet" signal; otherwise the parsed status response.
    pub async fn job_status(&self, job_id: &str) -> Result<Option<PollResponse>> {
        let url = format!("{}/outbound", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("job_id", job_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse status response: {}", e)))
    }
}
