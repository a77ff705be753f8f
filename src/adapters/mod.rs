//! ANO server integrations
//!
//! - [`store`] - the [`AnoMappingStore`] trait and mapping table shapes
//! - [`memory`] - in-process store
//! - [`postgresql`] - PostgreSQL store on a deadpool connection pool
//! - [`factory`] - builds the configured store

pub mod factory;
pub mod memory;
pub mod postgresql;
pub mod store;

pub use factory::create_mapping_store;
pub use memory::MemoryAnoStore;
pub use store::{AnoMappingStore, InsertOutcome, MappingColumn, MappingTableSchema};
