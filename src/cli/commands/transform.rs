//! Transform command implementation
//!
//! Reads a JSON row batch (`{"columns": [...], "rows": [[...]]}`), substitutes anonymous
//! identifiers into the destination column and writes the batch back out.

use super::configured_table;
use crate::adapters::create_mapping_store;
use crate::anonymisation::{AnoTransformer, AuditLogger, RowBatch};
use crate::config::load_config;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the transform command
#[derive(Args, Debug)]
pub struct TransformArgs {
    /// ANO table to use, as named in [[anonymisation.tables]]
    #[arg(short, long)]
    pub table: String,

    /// JSON row batch to read
    #[arg(short, long)]
    pub input: PathBuf,

    /// Column holding the real identifiers
    #[arg(short, long)]
    pub source: String,

    /// Column to receive the anonymous identifiers (defaults to the ANO table's column name)
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Generate throwaway identifiers without touching the ANO server
    #[arg(long)]
    pub preview: bool,

    /// Where to write the transformed batch (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl TransformArgs {
    /// Execute the transform command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(table = %self.table, preview = self.preview, "Starting transform command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let table = match configured_table(&config, &self.table) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        let content = std::fs::read_to_string(&self.input)?;
        let mut batch: RowBatch = serde_json::from_str(&content)?;

        let transformer = if self.preview {
            AnoTransformer::preview_only(table.clone())
        } else {
            match create_mapping_store(&config) {
                Ok(store) => AnoTransformer::new(table.clone(), store),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create ANO store");
                    eprintln!("Invalid ANO server configuration: {e}");
                    return Ok(2);
                }
            }
        };
        let mut transformer =
            transformer.with_max_collision_retries(config.anonymisation.max_collision_retries);

        let audit = &config.anonymisation.audit;
        if audit.enabled {
            transformer = transformer.with_audit(AuditLogger::new(
                PathBuf::from(&audit.log_path),
                audit.json_format,
                true,
            )?);
        }

        let destination = self
            .destination
            .clone()
            .unwrap_or_else(|| table.anonymous_column_name().to_string());

        let summary = match transformer
            .transform(&mut batch, &self.source, &destination, self.preview)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                crate::log_error_with_context!(&e, "Transform failed");
                eprintln!("Transform failed: {e}");
                return Ok(5);
            }
        };

        let rendered = serde_json::to_string_pretty(&batch)?;
        match &self.output {
            Some(path) => std::fs::write(path, rendered)?,
            None => println!("{rendered}"),
        }

        eprintln!();
        eprintln!("📊 Transform Summary:");
        for line in summary.to_string().lines() {
            eprintln!("  {line}");
        }
        if summary.preview {
            eprintln!();
            eprintln!("⚠️  Preview identifiers are not stored and will differ on every run");
        }

        Ok(0)
    }
}
