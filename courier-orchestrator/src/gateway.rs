//! Remote service seams
//!
//! Traits for the two external services the engine talks to, with
//! implementations backed by the HTTP clients. The poller, submitter, and
//! lifecycle gate only see these traits, so tests drive them with scripted
//! doubles.

use async_trait::async_trait;
use courier_client::error::Result;
use courier_client::{LifecycleClient, WorkerClient};
use courier_core::dto::job::{ActionRequest, SubmitAck};
use courier_core::dto::lifecycle::InstanceStatus;
use courier_core::dto::worker::PollResponse;

/// Job submission and status polling against the worker
#[async_trait]
pub trait WorkerGateway: Send + Sync {
    /// Submits one action job.
    async fn submit(&self, request: &ActionRequest) -> Result<SubmitAck>;

    /// Polls one job's status; `None` means "not ready yet" (empty body).
    async fn status(&self, job_id: &str) -> Result<Option<PollResponse>>;
}

#[async_trait]
impl WorkerGateway for WorkerClient {
    async fn submit(&self, request: &ActionRequest) -> Result<SubmitAck> {
        self.submit_job(request).await
    }

    async fn status(&self, job_id: &str) -> Result<Option<PollResponse>> {
        self.job_status(job_id).await
    }
}

/// Start/status control over the worker's host
#[async_trait]
pub trait LifecycleControl: Send + Sync {
    /// Queries the host's current lifecycle status.
    async fn status(&self) -> Result<InstanceStatus>;

    /// Issues a start command; returns once the command is accepted.
    async fn start(&self) -> Result<()>;
}

/// Control-plane-backed implementation bound to one instance
pub struct InstanceControl {
    client: LifecycleClient,
    instance: String,
}

impl InstanceControl {
    pub fn new(client: LifecycleClient, instance: impl Into<String>) -> Self {
        Self {
            client,
            instance: instance.into(),
        }
    }
}

#[async_trait]
impl LifecycleControl for InstanceControl {
    async fn status(&self) -> Result<InstanceStatus> {
        self.client.instance_status(&self.instance).await
    }

    async fn start(&self) -> Result<()> {
        self.client.start_instance(&self.instance).await
    }
}

/// Control for deployments without a managed host: always reports running
pub struct AlwaysRunning;

#[async_trait]
impl LifecycleControl for AlwaysRunning {
    async fn status(&self) -> Result<InstanceStatus> {
        Ok(InstanceStatus {
            status: "RUNNING".to_string(),
            extra: serde_json::Map::new(),
        })
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }
}
