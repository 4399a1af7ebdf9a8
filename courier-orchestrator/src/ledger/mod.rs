//! Durable tabular job ledger
//!
//! One table per batch/session, a fixed header row, and 1-based data row
//! indices. Row indices stay contiguous after every append and delete;
//! deletion renumbering of the outstanding set is coordinated by the
//! orchestrator facade so the two always move in one logical step.

pub mod file;

pub use file::FileLedger;

use courier_core::domain::ledger::LedgerRef;
use thiserror::Error;

/// Fixed column layout of every ledger table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    SentAt,
    Action,
    Params,
    ReceivedAt,
    ResultRef,
    JobId,
    Status,
    AttachmentRefs,
}

impl Column {
    /// All columns in header order
    pub const ALL: [Column; 8] = [
        Column::SentAt,
        Column::Action,
        Column::Params,
        Column::ReceivedAt,
        Column::ResultRef,
        Column::JobId,
        Column::Status,
        Column::AttachmentRefs,
    ];

    /// Header label of this column
    pub fn name(&self) -> &'static str {
        match self {
            Column::SentAt => "SentAt",
            Column::Action => "Action",
            Column::Params => "Params",
            Column::ReceivedAt => "ReceivedAt",
            Column::ResultRef => "ResultRef",
            Column::JobId => "JobID",
            Column::Status => "Status",
            Column::AttachmentRefs => "AttachmentRefs",
        }
    }

    /// Zero-based cell position within a row
    pub fn index(&self) -> usize {
        Column::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }

    /// The header row every table starts with
    pub fn header() -> Vec<String> {
        Column::ALL.iter().map(|c| c.name().to_string()).collect()
    }
}

/// One data row; cells ordered per [`Column::ALL`]
pub type LedgerRow = Vec<String>;

/// Partial update of one row
///
/// When `expect_job_id` is set, the addressed row's JobID cell must match
/// or the update is rejected with [`LedgerError::RowMismatch`] — the guard
/// against a human reordering rows underneath the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct RowPatch {
    fields: Vec<(Column, String)>,
    expect_job_id: Option<String>,
}

impl RowPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: Column, value: impl Into<String>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    pub fn expect_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.expect_job_id = Some(job_id.into());
        self
    }

    pub fn fields(&self) -> &[(Column, String)] {
        &self.fields
    }

    pub fn expected_job_id(&self) -> Option<&str> {
        self.expect_job_id.as_deref()
    }
}

/// Errors from ledger storage
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O failed for table '{table}': {source}")]
    Io {
        table: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger table '{table}' is corrupt: {detail}")]
    Corrupt { table: String, detail: String },

    #[error("ledger table '{0}' does not exist")]
    UnknownTable(String),

    #[error("row {row} is out of bounds for table '{table}' ({rows} data rows)")]
    RowOutOfBounds {
        table: String,
        row: usize,
        rows: usize,
    },

    #[error("row {row} in table '{table}' holds job '{found}', expected '{expected}'")]
    RowMismatch {
        table: String,
        row: usize,
        expected: String,
        found: String,
    },
}

/// Row-addressed store of job records, one named table per batch
pub trait Ledger: Send + Sync {
    /// Opens an existing table by name.
    fn open(&self, table_name: &str) -> Result<LedgerRef, LedgerError>;

    /// Opens a table by name, creating it (with header) on first use.
    fn open_or_create(&self, table_name: &str) -> Result<LedgerRef, LedgerError>;

    /// Appends rows, returning their 1-based indices in input order.
    ///
    /// Creates the table (with header) on first use.
    fn append(&self, table: &LedgerRef, rows: &[LedgerRow]) -> Result<Vec<usize>, LedgerError>;

    /// Applies a partial update to one row.
    fn update(
        &self,
        table: &LedgerRef,
        row_index: usize,
        patch: &RowPatch,
    ) -> Result<(), LedgerError>;

    /// Reads a single cell.
    fn read_field(
        &self,
        table: &LedgerRef,
        row_index: usize,
        column: Column,
    ) -> Result<String, LedgerError>;

    /// Reads all data rows. Also serves as the per-run "open" check: a
    /// table this call rejects must not have its jobs dropped.
    fn read_rows(&self, table: &LedgerRef) -> Result<Vec<LedgerRow>, LedgerError>;

    /// Deletes rows by index, processed highest-to-lowest to avoid index
    /// drift. Returns the deleted indices in descending order; remaining
    /// rows are renumbered so indices stay contiguous from 1.
    fn delete(&self, table: &LedgerRef, row_indices: &[usize]) -> Result<Vec<usize>, LedgerError>;
}
