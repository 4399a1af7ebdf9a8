//! File-backed ledger
//!
//! One JSON document per table under the ledger directory. Writes go
//! through a temp file followed by a rename so a crash never leaves a
//! half-written table.

use std::fs;
use std::path::{Path, PathBuf};

use courier_core::domain::ledger::LedgerRef;
use serde::{Deserialize, Serialize};

use super::{Column, Ledger, LedgerError, LedgerRow, RowPatch};
use crate::sanitize::sanitize;

/// Ledger implementation storing each table as a JSON file
pub struct FileLedger {
    dir: PathBuf,
}

/// On-disk shape of one table
#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    table_id: String,
    table_name: String,
    header: Vec<String>,
    rows: Vec<LedgerRow>,
}

impl FileLedger {
    /// Creates a ledger rooted at `dir`; the directory is created lazily
    /// on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn table_path(&self, table_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(table_name)))
    }

    fn load(&self, table_name: &str, path: &Path) -> Result<TableFile, LedgerError> {
        if !path.exists() {
            return Err(LedgerError::UnknownTable(table_name.to_string()));
        }

        let raw = fs::read_to_string(path).map_err(|source| LedgerError::Io {
            table: table_name.to_string(),
            source,
        })?;

        let table: TableFile =
            serde_json::from_str(&raw).map_err(|e| LedgerError::Corrupt {
                table: table_name.to_string(),
                detail: e.to_string(),
            })?;

        if table.header != Column::header() {
            return Err(LedgerError::Corrupt {
                table: table_name.to_string(),
                detail: format!("unexpected header {:?}", table.header),
            });
        }

        Ok(table)
    }

    fn store(&self, table: &TableFile) -> Result<(), LedgerError> {
        let io_err = |source| LedgerError::Io {
            table: table.table_name.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        let path = self.table_path(&table.table_name);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(table).map_err(|e| LedgerError::Corrupt {
            table: table.table_name.clone(),
            detail: e.to_string(),
        })?;

        fs::write(&tmp, body).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;

        Ok(())
    }

    fn load_or_create(&self, table: &LedgerRef) -> Result<TableFile, LedgerError> {
        match self.load(&table.table_name, &self.table_path(&table.table_name)) {
            Ok(file) => Ok(file),
            Err(LedgerError::UnknownTable(_)) => Ok(TableFile {
                table_id: table.table_id.clone(),
                table_name: table.table_name.clone(),
                header: Column::header(),
                rows: Vec::new(),
            }),
            Err(e) => Err(e),
        }
    }

    fn check_bounds(table: &TableFile, row_index: usize) -> Result<(), LedgerError> {
        if row_index == 0 || row_index > table.rows.len() {
            return Err(LedgerError::RowOutOfBounds {
                table: table.table_name.clone(),
                row: row_index,
                rows: table.rows.len(),
            });
        }
        Ok(())
    }
}

impl Ledger for FileLedger {
    fn open(&self, table_name: &str) -> Result<LedgerRef, LedgerError> {
        let table = self.load(table_name, &self.table_path(table_name))?;
        Ok(LedgerRef::new(table.table_id, table.table_name))
    }

    fn open_or_create(&self, table_name: &str) -> Result<LedgerRef, LedgerError> {
        match self.open(table_name) {
            Ok(table) => Ok(table),
            Err(LedgerError::UnknownTable(_)) => {
                let table = LedgerRef::create(table_name);
                self.store(&TableFile {
                    table_id: table.table_id.clone(),
                    table_name: table.table_name.clone(),
                    header: Column::header(),
                    rows: Vec::new(),
                })?;
                Ok(table)
            }
            Err(e) => Err(e),
        }
    }

    fn append(&self, table: &LedgerRef, rows: &[LedgerRow]) -> Result<Vec<usize>, LedgerError> {
        let mut file = self.load_or_create(table)?;

        let first = file.rows.len() + 1;
        for row in rows {
            let mut cells = row.clone();
            cells.resize(Column::ALL.len(), String::new());
            file.rows.push(cells);
        }
        self.store(&file)?;

        Ok((first..first + rows.len()).collect())
    }

    fn update(
        &self,
        table: &LedgerRef,
        row_index: usize,
        patch: &RowPatch,
    ) -> Result<(), LedgerError> {
        let mut file = self.load(&table.table_name, &self.table_path(&table.table_name))?;
        Self::check_bounds(&file, row_index)?;

        if let Some(expected) = patch.expected_job_id() {
            let found = &file.rows[row_index - 1][Column::JobId.index()];
            if found != expected {
                return Err(LedgerError::RowMismatch {
                    table: file.table_name.clone(),
                    row: row_index,
                    expected: expected.to_string(),
                    found: found.clone(),
                });
            }
        }

        for (column, value) in patch.fields() {
            file.rows[row_index - 1][column.index()] = value.clone();
        }
        self.store(&file)
    }

    fn read_field(
        &self,
        table: &LedgerRef,
        row_index: usize,
        column: Column,
    ) -> Result<String, LedgerError> {
        let file = self.load(&table.table_name, &self.table_path(&table.table_name))?;
        Self::check_bounds(&file, row_index)?;

        Ok(file.rows[row_index - 1][column.index()].clone())
    }

    fn read_rows(&self, table: &LedgerRef) -> Result<Vec<LedgerRow>, LedgerError> {
        let file = self.load(&table.table_name, &self.table_path(&table.table_name))?;
        Ok(file.rows)
    }

    fn delete(&self, table: &LedgerRef, row_indices: &[usize]) -> Result<Vec<usize>, LedgerError> {
        let mut file = self.load(&table.table_name, &self.table_path(&table.table_name))?;

        // Highest-to-lowest, duplicates dropped, bounds checked before any
        // removal so the operation is all-or-nothing.
        let mut ordered: Vec<usize> = row_indices.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        for &row_index in &ordered {
            Self::check_bounds(&file, row_index)?;
        }
        for &row_index in &ordered {
            file.rows.remove(row_index - 1);
        }
        self.store(&file)?;

        Ok(ordered)
    }
}
