//! Persisted orchestration state
//!
//! The outstanding set (every job not yet in a terminal status) lives in
//! an injected key-value state handle so polling survives process
//! restarts. The handle is scoped to the orchestrator instance; nothing
//! here touches ambient process-wide state.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use courier_core::domain::ledger::LedgerRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State key holding the serialized outstanding set
pub const OUTSTANDING_KEY: &str = "outstanding_jobs";

/// State key marking the batch the poll timer was armed for
pub const ACTIVE_BATCH_KEY: &str = "active_batch";

/// Errors from the persisted state handle
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state entry '{key}' is corrupt: {detail}")]
    Corrupt { key: String, detail: String },
}

/// Injected persistent-state handle with defined read/write/clear
pub trait StateStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StateError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StateError>;
    fn clear(&self, key: &str) -> Result<(), StateError>;
}

/// State store persisting all keys in one JSON file
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>, StateError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| StateError::Corrupt {
            key: "<root>".to_string(),
            detail: e.to_string(),
        })
    }

    fn store_map(&self, map: &BTreeMap<String, String>) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        let body = serde_json::to_string_pretty(map).map_err(|e| StateError::Corrupt {
            key: "<root>".to_string(),
            detail: e.to_string(),
        })?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn read(&self, key: &str) -> Result<Option<String>, StateError> {
        Ok(self.load_map()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StateError> {
        let mut map = self.load_map()?;
        map.insert(key.to_string(), value.to_string());
        self.store_map(&map)
    }

    fn clear(&self, key: &str) -> Result<(), StateError> {
        let mut map = self.load_map()?;
        if map.remove(key).is_some() {
            self.store_map(&map)?;
        }
        Ok(())
    }
}

/// One outstanding (non-terminal) job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutstandingEntry {
    pub job_id: String,
    pub table: LedgerRef,
    /// 1-based data row of the job inside its table
    pub row_index: usize,
    pub action: String,
    pub submitted_at: DateTime<Utc>,
}

/// The set of jobs still driving the poll timer
///
/// Keyed by job id; iteration order is deterministic. Invariant: every
/// entry corresponds to a live ledger row, and ledger-row deletion runs
/// [`OutstandingSet::renumber_after_delete`] in the same logical step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutstandingSet {
    jobs: BTreeMap<String, OutstandingEntry>,
}

impl OutstandingSet {
    /// Loads the set from the state handle; a missing key is an empty set.
    pub fn load(store: &dyn StateStore) -> Result<Self, StateError> {
        match store.read(OUTSTANDING_KEY)? {
            None => Ok(Self::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StateError::Corrupt {
                key: OUTSTANDING_KEY.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Persists the set; an empty set removes the key entirely.
    pub fn save(&self, store: &dyn StateStore) -> Result<(), StateError> {
        if self.jobs.is_empty() {
            return store.clear(OUTSTANDING_KEY);
        }
        let raw = serde_json::to_string(self).map_err(|e| StateError::Corrupt {
            key: OUTSTANDING_KEY.to_string(),
            detail: e.to_string(),
        })?;
        store.write(OUTSTANDING_KEY, &raw)
    }

    pub fn insert(&mut self, entry: OutstandingEntry) {
        self.jobs.insert(entry.job_id.clone(), entry);
    }

    pub fn remove(&mut self, job_id: &str) -> Option<OutstandingEntry> {
        self.jobs.remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutstandingEntry> {
        self.jobs.values()
    }

    pub fn get(&self, job_id: &str) -> Option<&OutstandingEntry> {
        self.jobs.get(job_id)
    }

    /// Partitions entries by table so each table is opened once per run.
    pub fn by_table(&self) -> Vec<(LedgerRef, Vec<OutstandingEntry>)> {
        let mut tables: BTreeMap<String, (LedgerRef, Vec<OutstandingEntry>)> = BTreeMap::new();
        for entry in self.jobs.values() {
            tables
                .entry(entry.table.table_id.clone())
                .or_insert_with(|| (entry.table.clone(), Vec::new()))
                .1
                .push(entry.clone());
        }
        tables.into_values().collect()
    }

    /// Applies the index shift caused by deleting one ledger row.
    ///
    /// Removes the entry sitting exactly at `deleted_index` (if any) and
    /// decrements the stored index of every same-table entry above it.
    /// Entries below the deleted row, and entries of other tables, are
    /// untouched.
    pub fn renumber_after_delete(
        &mut self,
        table_id: &str,
        deleted_index: usize,
    ) -> Option<OutstandingEntry> {
        let removed_key = self
            .jobs
            .iter()
            .find(|(_, e)| e.table.table_id == table_id && e.row_index == deleted_index)
            .map(|(k, _)| k.clone());
        let removed = removed_key.and_then(|k| self.jobs.remove(&k));

        for entry in self.jobs.values_mut() {
            if entry.table.table_id == table_id && entry.row_index > deleted_index {
                entry.row_index -= 1;
            }
        }

        removed
    }
}
