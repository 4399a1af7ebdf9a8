//! Remote lifecycle gate
//!
//! Ensures the worker's host is running before a batch is submitted. The
//! gate is idempotent: while the host reports running, no start command is
//! ever issued.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{OrchestratorError, Result};
use crate::gateway::LifecycleControl;

/// Outcome of a successful [`RemoteLifecycleGate::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ready {
    /// Host was already running; no side effect
    AlreadyRunning,
    /// Start command issued and the boot delay elapsed
    Started,
}

/// Idempotent "ensure running" check against the control plane
pub struct RemoteLifecycleGate {
    control: Arc<dyn LifecycleControl>,
    boot_delay: Duration,
}

impl RemoteLifecycleGate {
    pub fn new(control: Arc<dyn LifecycleControl>, boot_delay: Duration) -> Self {
        Self {
            control,
            boot_delay,
        }
    }

    /// Makes sure the worker host is running.
    ///
    /// The boot delay is a fixed upper-bound wait after the start command
    /// is accepted, not a readiness probe: callers may only assume the
    /// command went through, not that the worker accepts connections yet.
    /// Any control-plane or authentication failure aborts the caller's
    /// batch before it writes anything.
    pub async fn ensure(&self) -> Result<Ready> {
        let status = self
            .control
            .status()
            .await
            .map_err(|e| OrchestratorError::Lifecycle(e.to_string()))?;

        if status.is_running() {
            debug!("worker host already running");
            return Ok(Ready::AlreadyRunning);
        }

        info!(status = %status.status, "worker host is down, issuing start");
        self.control
            .start()
            .await
            .map_err(|e| OrchestratorError::Lifecycle(e.to_string()))?;

        info!(delay = ?self.boot_delay, "start accepted, waiting out the boot delay");
        tokio::time::sleep(self.boot_delay).await;

        Ok(Ready::Started)
    }
}
