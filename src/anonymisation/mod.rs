//! Identifier anonymisation
//!
//! Real identifiers (e.g. CHI numbers) are replaced by anonymous values shaped by an
//! [`AnoTable`]. Substitutions are permanent: once a real value has been given an anonymous
//! value in the mapping store, every later transform returns the same one.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rdmp::adapters::MemoryAnoStore;
//! use rdmp::anonymisation::{AnoTableRegistry, AnoTransformer, RowBatch};
//! use std::sync::Arc;
//!
//! # async fn example() -> rdmp::domain::Result<()> {
//! let mut registry = AnoTableRegistry::new();
//! let table = registry.create("ANOCHI", 10, 0, "A")?.clone();
//!
//! let mut transformer = AnoTransformer::new(table, Arc::new(MemoryAnoStore::new()));
//! let mut batch = RowBatch::new(["CHI"]);
//! batch.push_row(vec![Some("0101010101".to_string())])?;
//! transformer.transform(&mut batch, "CHI", "ANOCHI", false).await?;
//! # Ok(())
//! # }
//! ```

pub mod ano_table;
pub mod audit;
pub mod batch;
pub mod generator;
pub mod push;
pub mod registry;
pub mod report;
pub mod transformer;

pub use ano_table::{validate_identifiable_type, AnoTable};
pub use audit::AuditLogger;
pub use batch::RowBatch;
pub use generator::AnonymousValueGenerator;
pub use push::push_to_ano_server_as_new_table;
pub use registry::AnoTableRegistry;
pub use report::TransformSummary;
pub use transformer::{AnoTransformer, DEFAULT_MAX_COLLISION_RETRIES};
