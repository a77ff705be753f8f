//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the RDMP configuration file.

use crate::adapters::postgresql::PostgreSQLClient;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    /// Also open a connection to the ANO server
    #[arg(long)]
    pub test_connection: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates, so any error here is reported as a configuration error.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);

        match &config.ano_store {
            Some(store) => {
                use secrecy::ExposeSecret;
                let connection_string: &str = store.connection_string.expose_secret().as_ref();
                println!(
                    "  ANO Server: {}",
                    connection_string.split('@').next_back().unwrap_or("***")
                );
                println!("  Max Connections: {}", store.max_connections);
            }
            None => println!("  ANO Server: not configured (preview transforms only)"),
        }

        println!(
            "  Max Collision Retries: {}",
            config.anonymisation.max_collision_retries
        );
        println!(
            "  Audit Log: {}",
            if config.anonymisation.audit.enabled {
                config.anonymisation.audit.log_path.as_str()
            } else {
                "disabled"
            }
        );
        println!("  SQL Dialect: {:?}", config.query_builder.dialect);

        if config.anonymisation.tables.is_empty() {
            println!("  ANO Tables: none");
        } else {
            println!("  ANO Tables:");
            for table in &config.anonymisation.tables {
                println!(
                    "    - {} ({} digits, {} letters, suffix _{})",
                    table.name, table.integer_count, table.character_count, table.suffix
                );
            }
        }
        println!();

        if self.test_connection {
            let Some(store) = config.ano_store.clone() else {
                println!("❌ No [ano_store] section to test");
                return Ok(2);
            };
            let result = match PostgreSQLClient::new(store) {
                Ok(client) => client.test_connection().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => println!("✅ ANO server connection successful"),
                Err(e) => {
                    println!("❌ ANO server connection failed");
                    println!("   Error: {e}");
                    return Ok(5);
                }
            }
        }

        Ok(0)
    }
}
