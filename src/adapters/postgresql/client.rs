//! PostgreSQL connection pool for the ANO server

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{RdmpError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// Pooled connections to the ANO server database
///
/// Every statement runs with the configured `statement_timeout`.
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Builds the pool; no connection is opened until the first statement
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed or the pool cannot be built.
    pub fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                RdmpError::Configuration(format!("Invalid PostgreSQL connection string: {}", e))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| RdmpError::Database(format!("Failed to create connection pool: {}", e)))?;

        Ok(Self { pool, config })
    }

    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| RdmpError::Database(format!("Connection test failed: {}", e)))?;

        tracing::info!(server = %self.connection_string_safe(), "ANO server connection test successful");
        Ok(())
    }

    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        let client = self.pool.get().await.map_err(|e| {
            RdmpError::Database(format!("Failed to get connection from pool: {}", e))
        })?;

        let timeout = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout)
            .await
            .map_err(|e| RdmpError::Database(format!("Failed to set statement timeout: {}", e)))?;

        Ok(client)
    }

    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| RdmpError::Database(format!("Query failed: {}", e)))
    }

    /// Runs a statement and returns the number of affected rows
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.get_connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| RdmpError::Database(format!("Statement execution failed: {}", e)))
    }

    pub async fn batch_execute(&self, sql: &str) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .batch_execute(sql)
            .await
            .map_err(|e| RdmpError::Database(format!("Statement execution failed: {}", e)))
    }

    /// Host and database part of the connection string, credentials removed
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_ref())
    }
}

fn redact_connection_string(connection_string: &str) -> String {
    match connection_string.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{}", host),
        None => "postgresql://***".to_string(),
    }
}
