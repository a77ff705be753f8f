//! Mapping store factory

use super::postgresql::{PostgreSQLClient, PostgreSqlAnoStore};
use super::store::AnoMappingStore;
use crate::config::RdmpConfig;
use crate::domain::{RdmpError, Result};
use std::sync::Arc;

/// Creates the mapping store described by `[ano_store]`
///
/// # Errors
///
/// Returns a configuration error if `[ano_store]` is absent or its connection string is invalid.
pub fn create_mapping_store(config: &RdmpConfig) -> Result<Arc<dyn AnoMappingStore>> {
    let store_config = config.ano_store.as_ref().ok_or_else(|| {
        RdmpError::Configuration(
            "[ano_store] configuration is required for committed transforms and push".to_string(),
        )
    })?;

    tracing::info!("Creating PostgreSQL ANO store");
    let client = PostgreSQLClient::new(store_config.clone())?;
    Ok(Arc::new(PostgreSqlAnoStore::new(client)))
}
