//! CLI command implementations

pub mod build_sql;
pub mod init;
pub mod push;
pub mod transform;
pub mod validate;

use crate::anonymisation::{AnoTable, AnoTableRegistry};
use crate::config::RdmpConfig;

/// Looks up an ANO table declared under `[[anonymisation.tables]]`
fn configured_table(config: &RdmpConfig, name: &str) -> crate::domain::Result<AnoTable> {
    let registry = AnoTableRegistry::from_definitions(&config.anonymisation.tables)?;
    Ok(registry.get_by_name(name)?.clone())
}
