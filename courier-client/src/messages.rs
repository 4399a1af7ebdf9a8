//! Worker message-queue inspection endpoints

use crate::WorkerClient;
use crate::error::Result;
use courier_core::dto::worker::{ClearMessagesAck, MessageInventory};

impl WorkerClient {
    /// List every message in each worker queue stage
    ///
    /// Stages are inbound, processing, outbound, consumed and failed;
    /// useful for diagnosing a job that never leaves `Polling`.
    pub async fn list_messages(&self) -> Result<MessageInventory> {
        let url = format!("{}/messages", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Clear all messages in every worker queue stage
    ///
    /// # Returns
    /// Per-stage counts of removed messages.
    pub async fn clear_messages(&self) -> Result<ClearMessagesAck> {
        let url = format!("{}/messages/clear", self.base_url);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }
}
