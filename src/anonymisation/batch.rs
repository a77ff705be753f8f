//! In-memory row batches passed through the transformer

use crate::domain::{AnoError, RdmpError, Result};
use serde::{Deserialize, Serialize};

/// A table of nullable string cells
///
/// Serialised as `{"columns": [...], "rows": [[...], ...]}` with `null` for missing values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowBatch {
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, which must have one cell per column
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(RdmpError::Validation(format!(
                "Row has {} cells but the batch has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup
    pub fn column_index(&self, name: &str) -> std::result::Result<usize, AnoError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| AnoError::ColumnNotFound(name.to_string()))
    }

    /// Index of `name`, adding it filled with nulls if absent
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Ok(index) = self.column_index(name) {
            return index;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(None);
        }
        self.columns.len() - 1
    }

    /// Checks that every row has one cell per column (batches read from JSON are not checked on load)
    pub fn validate(&self) -> Result<()> {
        match self.rows.iter().position(|r| r.len() != self.columns.len()) {
            Some(index) => Err(RdmpError::Validation(format!(
                "Row {} has {} cells but the batch has {} columns",
                index,
                self.rows[index].len(),
                self.columns.len()
            ))),
            None => Ok(()),
        }
    }
}
