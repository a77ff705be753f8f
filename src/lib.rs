// RDMP - Identifier anonymisation and extraction query building
// Copyright (c) 2025 RDMP Contributors
// Licensed under the MIT License

//! # RDMP
//!
//! Two building blocks of a research data management platform:
//!
//! - **Identifier anonymisation**: real identifiers (CHI numbers, lab numbers) are replaced by
//!   anonymous values shaped by an ANO table. Mappings live on an ANO server and are permanent,
//!   so the same real value always produces the same anonymous value.
//! - **Extraction query building**: a set of selected catalogue columns is turned into a single
//!   `SELECT` statement, with the joins between their tables and the lookup descriptions
//!   resolved from the catalogue.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`anonymisation`] - ANO tables, value generation and the transformer
//! - [`query`] - Join and lookup resolution, SQL assembly
//! - [`catalogue`] - Tables, columns, joins and lookups known to the query builder
//! - [`checks`] - Check notification (collect or fail fast)
//! - [`adapters`] - ANO server stores (in-memory, PostgreSQL)
//! - [`domain`] - Identifiers and error types
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rdmp::adapters::MemoryAnoStore;
//! use rdmp::anonymisation::{AnoTableRegistry, AnoTransformer, RowBatch};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = AnoTableRegistry::new();
//!     let table = registry.create("ANOCHI", 9, 1, "A")?.clone();
//!
//!     let mut batch = RowBatch::new(["CHI"]);
//!     batch.push_row(vec![Some("0101010101".to_string())])?;
//!
//!     let mut transformer = AnoTransformer::new(table, Arc::new(MemoryAnoStore::new()));
//!     let summary = transformer.transform(&mut batch, "CHI", "ANOCHI", true).await?;
//!
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Building SQL
//!
//! ```rust,no_run
//! use rdmp::query::QueryDocument;
//!
//! # fn example() -> rdmp::domain::Result<()> {
//! let mut builder = QueryDocument::load("query.toml")?.into_builder()?;
//! println!("{}", builder.sql()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`domain::Result`], whose error type [`domain::RdmpError`] wraps
//! the query building and anonymisation errors so they can be matched on directly.

pub mod adapters;
pub mod anonymisation;
pub mod catalogue;
pub mod checks;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod query;
