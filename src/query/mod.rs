//! Extraction query builder
//!
//! Turns a set of catalogue columns plus the joins and lookups declared between their tables
//! into a single SELECT statement:
//!
//! 1. decide which requested columns are lookup descriptions ([`lookups`])
//! 2. pick the FROM table and join every other table to it ([`joins`])
//! 3. lay out the SELECT list, JOINs, WHERE and custom lines ([`builder`])

pub mod builder;
pub mod column;
pub mod document;
pub mod filter;
pub mod joins;
pub mod lookups;

pub use builder::{build_sql, BuiltQuery, QueryBuilder, SqlDialect};
pub use column::{IdentifierSubstitution, QueryColumn};
pub use document::QueryDocument;
pub use filter::{CustomLine, Filter, FilterContainer, FilterOperation, QueryComponent, SqlParameter};
pub use joins::{JoinPlan, ResolvedJoin};
pub use lookups::LookupAlias;
