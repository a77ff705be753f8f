//! PostgreSQL ANO server
//!
//! [`PostgreSQLClient`] wraps a deadpool connection pool and [`PostgreSqlAnoStore`] implements
//! the mapping store on top of it.

pub mod client;
pub mod store;

pub use client::PostgreSQLClient;
pub use store::PostgreSqlAnoStore;
