//! Transform outcome reporting

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts describing one transform call; never carries identifier values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSummary {
    pub ano_table: String,
    pub source_column: String,
    pub destination_column: String,

    /// Rows in the batch
    pub rows: usize,

    /// Distinct non-null real values
    pub distinct_values: usize,

    /// Values that already had a mapping in the store
    pub reused: usize,

    /// Values given a new mapping (or a throwaway one in preview mode)
    pub newly_assigned: usize,

    pub preview: bool,
}

impl fmt::Display for TransformSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.preview { "preview" } else { "committed" };
        writeln!(f, "ANO table:        {}", self.ano_table)?;
        writeln!(f, "Mode:             {mode}")?;
        writeln!(f, "Columns:          {} -> {}", self.source_column, self.destination_column)?;
        writeln!(f, "Rows:             {}", self.rows)?;
        writeln!(f, "Distinct values:  {}", self.distinct_values)?;
        writeln!(f, "Reused mappings:  {}", self.reused)?;
        write!(f, "New mappings:     {}", self.newly_assigned)
    }
}
