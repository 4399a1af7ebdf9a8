//! Courier Orchestrator
//!
//! Client-side engine that drives jobs through a remote, on-demand worker:
//!
//! - Lifecycle gate: ensure the worker host is running before use
//! - Submitter: post action jobs, one ledger row per outcome
//! - Ledger: durable tabular record of every job, one table per batch
//! - Poller: periodic status checks, classification, and write-back
//! - Materializer: persist result payloads and decoded attachments
//! - Scheduler: exactly one recurring poll timer while jobs are outstanding
//!
//! The [`Orchestrator`] facade wires these together over injected storage
//! and transport seams so every piece can be exercised in isolation.

pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod lifecycle;
pub mod materialize;
pub mod orchestrator;
pub mod poll;
pub mod sanitize;
pub mod scheduler;
pub mod state;
pub mod submit;

pub use config::Config;
pub use error::{OrchestratorError, Result};
pub use orchestrator::{BatchReceipt, Orchestrator};
pub use poll::{PollReport, Poller};
