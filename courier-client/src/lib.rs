//! Courier HTTP Client
//!
//! Type-safe HTTP clients for the two services the orchestrator consumes:
//! the on-demand worker (job submission, status polling, message
//! inspection) and the compute lifecycle control plane (instance
//! status/start behind a bearer token).
//!
//! # Example
//!
//! ```no_run
//! use courier_client::WorkerClient;
//! use courier_core::dto::job::ActionRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WorkerClient::new("http://worker.internal:5000");
//!
//!     let ack = client
//!         .submit_job(&ActionRequest::new(
//!             "full_recursive_download",
//!             serde_json::json!({"url": "https://example.com"}),
//!         ))
//!         .await?;
//!
//!     println!("job accepted: {:?}", ack.accepted_job_id());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
mod jobs;
mod lifecycle;
mod messages;

// Re-export commonly used types
pub use auth::{ExchangeTokenProvider, StaticTokenProvider, TokenProvider};
pub use error::{ClientError, Result};
pub use lifecycle::LifecycleClient;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the worker API
///
/// One instance serves all worker endpoints:
/// - Job submission (`POST /inbound`)
/// - Status polling (`GET /outbound`)
/// - Message-queue inspection (`GET /messages`, `POST /messages/clear`)
#[derive(Debug, Clone)]
pub struct WorkerClient {
    /// Base URL of the worker (e.g., "http://worker.internal:5000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl WorkerClient {
    /// Create a new worker client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the worker API
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create a new worker client with a custom HTTP client
    ///
    /// This allows configuring timeouts, proxies, TLS settings, etc.
    /// Every call the orchestrator makes is expected to be bounded by a
    /// request timeout configured here.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a new worker client with a per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Get the base URL of the worker
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
