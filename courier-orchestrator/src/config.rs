//! Orchestrator configuration
//!
//! Defines all configurable parameters: storage location, worker and
//! control-plane endpoints, and the polling/boot timing knobs.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{OrchestratorError, Result};

/// Orchestrator configuration
///
/// All timeouts and intervals are configurable to allow tuning for
/// different deployments (a slow-booting worker host needs a longer boot
/// delay; a cheap worker can be polled more often).
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the ledger tables, persisted state, and objects
    pub data_dir: PathBuf,

    /// Worker base URL (e.g., "http://worker.internal:5000")
    pub worker_url: String,

    /// How often the poller checks outstanding jobs
    pub poll_interval: Duration,

    /// Fixed upper-bound wait after a start command is accepted; not a
    /// readiness probe
    pub boot_delay: Duration,

    /// Per-request HTTP timeout for worker and control-plane calls
    pub request_timeout: Duration,

    /// Control-plane settings; absent means the worker host is assumed to
    /// be always running
    pub lifecycle: Option<LifecycleSettings>,
}

/// Control-plane connection settings
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Control-plane base URL
    pub control_url: String,
    /// Control-plane name of the worker host
    pub instance: String,
    /// Credential-exchange endpoint for bearer tokens
    pub token_url: String,
    /// Stored service credential to exchange
    pub service_credential: String,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(worker_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            worker_url: worker_url.into(),
            poll_interval: Duration::from_secs(60),
            boot_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            lifecycle: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized variables:
    /// - COURIER_WORKER_URL (default: http://localhost:5000)
    /// - COURIER_DATA_DIR (default: ./courier-data)
    /// - COURIER_POLL_INTERVAL_SECS (default: 60)
    /// - COURIER_BOOT_DELAY_SECS (default: 30)
    /// - COURIER_REQUEST_TIMEOUT_SECS (default: 30)
    /// - COURIER_CONTROL_URL, COURIER_INSTANCE, COURIER_TOKEN_URL,
    ///   COURIER_SERVICE_CREDENTIAL (all four together enable the
    ///   lifecycle gate)
    pub fn from_env() -> Result<Self> {
        let worker_url = std::env::var("COURIER_WORKER_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());
        let data_dir = std::env::var("COURIER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./courier-data"));

        let mut config = Self::new(worker_url, data_dir);

        if let Some(secs) = env_secs("COURIER_POLL_INTERVAL_SECS") {
            config.poll_interval = secs;
        }
        if let Some(secs) = env_secs("COURIER_BOOT_DELAY_SECS") {
            config.boot_delay = secs;
        }
        if let Some(secs) = env_secs("COURIER_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = secs;
        }

        config.lifecycle = lifecycle_from_env()?;

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker_url.is_empty() {
            return Err(OrchestratorError::Config(
                "worker_url cannot be empty".to_string(),
            ));
        }

        if !self.worker_url.starts_with("http://") && !self.worker_url.starts_with("https://") {
            return Err(OrchestratorError::Config(
                "worker_url must start with http:// or https://".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(OrchestratorError::Config(
                "poll_interval must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(OrchestratorError::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(lifecycle) = &self.lifecycle {
            if lifecycle.control_url.is_empty()
                || lifecycle.instance.is_empty()
                || lifecycle.token_url.is_empty()
            {
                return Err(OrchestratorError::Config(
                    "lifecycle settings must include control_url, instance, and token_url"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn lifecycle_from_env() -> Result<Option<LifecycleSettings>> {
    let vars = [
        "COURIER_CONTROL_URL",
        "COURIER_INSTANCE",
        "COURIER_TOKEN_URL",
        "COURIER_SERVICE_CREDENTIAL",
    ];
    let values: Vec<Option<String>> = vars.iter().map(|v| std::env::var(v).ok()).collect();

    let set_count = values.iter().filter(|v| v.is_some()).count();
    if set_count == 0 {
        return Ok(None);
    }
    if set_count < vars.len() {
        return Err(OrchestratorError::Config(format!(
            "lifecycle gating needs all of {}, found {} set",
            vars.join(", "),
            set_count
        )));
    }

    let mut values = values.into_iter().flatten();
    Ok(Some(LifecycleSettings {
        control_url: values.next().unwrap_or_default(),
        instance: values.next().unwrap_or_default(),
        token_url: values.next().unwrap_or_default(),
        service_credential: values.next().unwrap_or_default(),
    }))
}
