//! Push command implementation

use super::configured_table;
use crate::adapters::create_mapping_store;
use crate::anonymisation::push_to_ano_server_as_new_table;
use crate::checks::{CheckResult, ToMemoryCheckNotifier};
use crate::config::load_config;
use clap::Args;

/// Arguments for the push command
#[derive(Args, Debug)]
pub struct PushArgs {
    /// ANO table to push, as named in [[anonymisation.tables]]
    #[arg(short, long)]
    pub table: String,

    /// SQL type of the identifiable column, e.g. varchar(10)
    #[arg(long)]
    pub identifiable_type: String,
}

impl PushArgs {
    /// Execute the push command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(table = %self.table, "Starting push command");

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

        let store = match create_mapping_store(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Invalid ANO server configuration: {e}");
                return Ok(2);
            }
        };

        let notifier = ToMemoryCheckNotifier::new();
        if let Err(e) =
            push_to_ano_server_as_new_table(&table, store.as_ref(), &self.identifiable_type, &notifier).await
        {
            crate::log_error_with_context!(&e, "Push failed");
            eprintln!("Push failed: {e}");
            return Ok(5);
        }

        for event in notifier.events() {
            let icon = match event.result {
                CheckResult::Success => "✅",
                CheckResult::Warning => "⚠️ ",
                CheckResult::Fail => "❌",
            };
            println!("{icon} {}", event.message);
        }

        Ok(if notifier.worst() == CheckResult::Fail { 3 } else { 0 })
    }
}
