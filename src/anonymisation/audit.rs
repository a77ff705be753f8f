//! Audit log of transform runs
//!
//! One entry per transform call. Entries record which table and columns were processed and
//! how many mappings were reused or created, never the identifier values themselves.

use super::report::TransformSummary;
use crate::domain::{RdmpError, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct AuditLogEntry<'a> {
    timestamp: String,
    run_id: Uuid,
    #[serde(flatten)]
    summary: &'a TransformSummary,
}

/// Appends transform summaries to a JSON lines (or plain text) file
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RdmpError::Io(format!(
                        "Failed to create audit log directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    pub fn log_transform(&self, summary: &TransformSummary) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            run_id: Uuid::new_v4(),
            summary,
        };
        self.write_entry(&entry)
    }

    fn write_entry(&self, entry: &AuditLogEntry<'_>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| {
                RdmpError::Io(format!(
                    "Failed to open audit log {}: {}",
                    self.log_path.display(),
                    e
                ))
            })?;

        let line = if self.json_format {
            serde_json::to_string(entry)?
        } else {
            format!(
                "[{}] Run: {} | Table: {} | {} -> {} | Rows: {} | Distinct: {} | Reused: {} | New: {} | Preview: {}",
                entry.timestamp,
                entry.run_id,
                entry.summary.ano_table,
                entry.summary.source_column,
                entry.summary.destination_column,
                entry.summary.rows,
                entry.summary.distinct_values,
                entry.summary.reused,
                entry.summary.newly_assigned,
                entry.summary.preview
            )
        };

        writeln!(file, "{line}")
            .map_err(|e| RdmpError::Io(format!("Failed to write audit entry: {e}")))
    }
}
