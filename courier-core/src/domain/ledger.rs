//! Ledger domain types

use serde::{Deserialize, Serialize};

/// Identity of one ledger table (one table per batch/session).
///
/// `table_id` is the stable synthetic identifier assigned when the table is
/// created; `table_name` is the human-facing label used to open it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRef {
    pub table_id: String,
    pub table_name: String,
}

impl LedgerRef {
    pub fn new(table_id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            table_name: table_name.into(),
        }
    }

    /// Mints a reference for a brand-new table.
    pub fn create(table_name: impl Into<String>) -> Self {
        Self {
            table_id: uuid::Uuid::new_v4().to_string(),
            table_name: table_name.into(),
        }
    }
}
