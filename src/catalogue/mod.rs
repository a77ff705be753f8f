//! Catalogue metadata model
//!
//! The catalogue describes the datasets available for extraction: the physical tables, their
//! columns, and the declared relationships between them (plain [`JoinInfo`]s and description
//! [`Lookup`]s). The query builder consumes this model read-only.

pub mod join_info;
pub mod repository;
pub mod table_info;

pub use join_info::{ExtractionJoinType, JoinInfo, Lookup};
pub use repository::{CatalogueRepository, MemoryCatalogue, Relationships};
pub use table_info::{ColumnInfo, TableInfo};
