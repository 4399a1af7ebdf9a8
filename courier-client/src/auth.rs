//! Bearer-token acquisition for the lifecycle control plane
//!
//! The control plane authenticates every call with a bearer token obtained
//! by exchanging a stored service credential at a token endpoint. The
//! exchange result is cached until shortly before expiry so consecutive
//! lifecycle calls do not re-authenticate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ClientError, Result};
use courier_core::dto::lifecycle::TokenGrant;

/// Safety margin subtracted from the granted lifetime before re-exchange
const EXPIRY_SKEW_SECS: i64 = 30;

/// Source of bearer tokens for control-plane calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token currently valid for the control plane.
    async fn bearer_token(&self) -> Result<String>;
}

/// Fixed token, for tests and pre-authenticated environments
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Exchanges a stored service credential for a bearer token, with caching
pub struct ExchangeTokenProvider {
    client: Client,
    token_url: String,
    service_credential: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    valid_until: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    credential: &'a str,
}

impl ExchangeTokenProvider {
    /// Create a new exchange provider
    ///
    /// # Arguments
    /// * `token_url` - The credential-exchange endpoint
    /// * `service_credential` - The stored service credential to exchange
    pub fn new(token_url: impl Into<String>, service_credential: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token_url: token_url.into(),
            service_credential: service_credential.into(),
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<CachedToken> {
        let response = self
            .client
            .post(&self.token_url)
            .json(&ExchangeRequest {
                credential: &self.service_credential,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::AuthFailed(format!(
                "token exchange returned {}: {}",
                status, body
            )));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| ClientError::AuthFailed(format!("unusable token grant: {}", e)))?;

        if grant.access_token.is_empty() {
            return Err(ClientError::AuthFailed(
                "token exchange returned an empty access token".to_string(),
            ));
        }

        let valid_until = grant
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds((secs - EXPIRY_SKEW_SECS).max(0)));

        Ok(CachedToken {
            token: grant.access_token,
            valid_until,
        })
    }
}

#[async_trait]
impl TokenProvider for ExchangeTokenProvider {
    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            let still_valid = entry.valid_until.is_some_and(|until| Utc::now() < until);
            if still_valid {
                return Ok(entry.token.clone());
            }
        }

        debug!("exchanging service credential for a fresh bearer token");
        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);

        Ok(token)
    }
}
