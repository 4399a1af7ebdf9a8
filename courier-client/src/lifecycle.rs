//! Lifecycle control-plane client
//!
//! Wraps the two control-plane operations the orchestrator needs: querying
//! the worker host's state and issuing a start command. Every call carries
//! a bearer token from the configured [`TokenProvider`].

use std::sync::Arc;

use reqwest::Client;

use crate::auth::TokenProvider;
use crate::error::{ClientError, Result};
use courier_core::dto::lifecycle::InstanceStatus;

/// HTTP client for the compute lifecycle control plane
pub struct LifecycleClient {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl LifecycleClient {
    /// Create a new lifecycle client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the control plane
    /// * `tokens` - Bearer-token source for authentication
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            tokens,
        }
    }

    /// Create a new lifecycle client with a per-request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut built = Self::new(base_url, tokens);
        built.client = client;
        Ok(built)
    }

    /// Query the current status of a worker host
    ///
    /// # Arguments
    /// * `instance` - Control-plane name of the worker host
    pub async fn instance_status(&self, instance: &str) -> Result<InstanceStatus> {
        let token = self.tokens.bearer_token().await?;
        let url = format!("{}/instances/{}", self.base_url, instance);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse instance status: {}", e)))
    }

    /// Issue a start command for a worker host
    ///
    /// Returns once the control plane accepts the command; the host is not
    /// necessarily serving traffic yet.
    pub async fn start_instance(&self, instance: &str) -> Result<()> {
        let token = self.tokens.bearer_token().await?;
        let url = format!("{}/instances/{}/start", self.base_url, instance);

        let response = self.client.post(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), body));
        }

        Ok(())
    }
}
