//! Domain types shared by every RDMP module.
//!
//! - **Identifiers** ([`TableInfoId`], [`ColumnInfoId`], [`LookupId`], [`AnoTableId`])
//! - **Error types** ([`RdmpError`], [`QueryBuildingError`], [`AnoError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, RdmpError>`]. The query builder and the ANO
//! engine produce their own error enums, which convert into [`RdmpError`] with `?`:
//!
//! ```rust
//! use rdmp::domain::{AnoError, Result};
//!
//! fn save() -> Result<()> {
//!     Err(AnoError::EmptyRepresentation)?
//! }
//! assert!(save().is_err());
//! ```

pub mod errors;
pub mod ids;
pub mod result;

pub use errors::{AnoError, QueryBuildingError, RdmpError};
pub use ids::{AnoTableId, ColumnInfoId, LookupId, TableInfoId};
pub use result::Result;
