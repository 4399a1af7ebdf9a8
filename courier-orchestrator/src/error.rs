//! Error types for the orchestrator engine

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::materialize::ObjectStoreError;
use crate::state::StateError;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Top-level orchestrator errors
///
/// Per-job failures (submission, polling, attachment decode) never surface
/// here; they are recorded in the ledger and isolated from sibling jobs.
/// These variants are the genuinely batch-fatal conditions.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Control plane unreachable or authentication failed; the batch is
    /// aborted before any ledger write
    #[error("lifecycle control failed: {0}")]
    Lifecycle(String),

    /// Ledger storage failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Persisted orchestration state failed
    #[error(transparent)]
    State(#[from] StateError),

    /// Object store failed
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}
