//! Read access to the catalogue metadata
//!
//! The query builder never talks to the metadata database directly: it asks a
//! [`CatalogueRepository`] for the joins and lookups relevant to the tables it is assembling.
//! [`MemoryCatalogue`] is the in-process implementation used by the CLI and the tests.

use super::join_info::{JoinInfo, Lookup};
use super::table_info::{ColumnInfo, TableInfo};
use crate::domain::{ColumnInfoId, RdmpError, Result, TableInfoId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Joins and lookups visible to a set of tables
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    pub joins: Vec<JoinInfo>,
    pub lookups: Vec<Lookup>,
}

impl Relationships {
    pub fn new(joins: Vec<JoinInfo>, lookups: Vec<Lookup>) -> Self {
        Self { joins, lookups }
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty() && self.lookups.is_empty()
    }

    /// Plain joins connecting `a` and `b` in either direction, in declaration order
    pub fn joins_between(&self, a: TableInfoId, b: TableInfoId) -> Vec<&JoinInfo> {
        self.joins.iter().filter(|j| j.connects(a, b)).collect()
    }

    /// Lookups connecting their foreign key table and lookup table as `a` and `b`, either way round
    pub fn lookups_between(&self, a: TableInfoId, b: TableInfoId) -> Vec<&Lookup> {
        self.lookups
            .iter()
            .filter(|l| {
                let (fk, lookup) = (l.foreign_key.table_id(), l.lookup_table());
                (fk == a && lookup == b) || (fk == b && lookup == a)
            })
            .collect()
    }

    /// Lookups whose description column is `column`, in declaration order
    pub fn lookups_with_description(&self, column: ColumnInfoId) -> Vec<&Lookup> {
        self.lookups
            .iter()
            .filter(|l| l.description.id == column)
            .collect()
    }
}

/// Read-only view over the catalogue's tables, columns and relationships
pub trait CatalogueRepository: Send + Sync {
    fn table_info(&self, id: TableInfoId) -> Option<Arc<TableInfo>>;

    fn column_infos(&self, table: TableInfoId) -> Vec<ColumnInfo>;

    /// Every plain join between `a` and `b`, in either direction
    fn join_infos_between(&self, a: TableInfoId, b: TableInfoId) -> Vec<JoinInfo>;

    /// Every lookup that uses `column` as its description
    fn lookups_with_description(&self, column: ColumnInfoId) -> Vec<Lookup>;

    /// Every join between two of `tables` and every lookup described by one of their columns
    fn relationships_for(&self, tables: &[TableInfoId]) -> Relationships {
        let mut joins = Vec::new();
        for (i, a) in tables.iter().enumerate() {
            for b in &tables[i + 1..] {
                joins.extend(self.join_infos_between(*a, *b));
            }
        }

        let mut lookups: Vec<Lookup> = Vec::new();
        for table in tables {
            for column in self.column_infos(*table) {
                for lookup in self.lookups_with_description(column.id) {
                    if !lookups.iter().any(|l| l.id == lookup.id) {
                        lookups.push(lookup);
                    }
                }
            }
        }

        Relationships { joins, lookups }
    }
}

/// Catalogue held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryCatalogue {
    tables: BTreeMap<TableInfoId, Arc<TableInfo>>,
    columns: BTreeMap<ColumnInfoId, ColumnInfo>,
    joins: Vec<JoinInfo>,
    lookups: Vec<Lookup>,
}

impl MemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: TableInfo) -> Arc<TableInfo> {
        let table = Arc::new(table);
        self.tables.insert(table.id, table.clone());
        table
    }

    /// Registers a column on an existing table
    pub fn add_column(
        &mut self,
        id: ColumnInfoId,
        table: TableInfoId,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Result<ColumnInfo> {
        let table = self.tables.get(&table).cloned().ok_or_else(|| {
            RdmpError::Validation(format!("Cannot add column to unknown {table}"))
        })?;
        let column = ColumnInfo::new(id, table, name, data_type);
        self.columns.insert(id, column.clone());
        Ok(column)
    }

    pub fn add_join(&mut self, join: JoinInfo) {
        self.joins.push(join);
    }

    pub fn add_lookup(&mut self, lookup: Lookup) {
        self.lookups.push(lookup);
    }

    pub fn column(&self, id: ColumnInfoId) -> Option<&ColumnInfo> {
        self.columns.get(&id)
    }

    /// Finds a column by `<table name>.<column name>`
    pub fn find_column(&self, table_name: &str, column_name: &str) -> Option<&ColumnInfo> {
        self.columns.values().find(|c| {
            c.table.name.eq_ignore_ascii_case(table_name) && c.name.eq_ignore_ascii_case(column_name)
        })
    }

    pub fn find_table(&self, name: &str) -> Option<Arc<TableInfo>> {
        self.tables
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableInfo>> {
        self.tables.values()
    }
}

impl CatalogueRepository for MemoryCatalogue {
    fn table_info(&self, id: TableInfoId) -> Option<Arc<TableInfo>> {
        self.tables.get(&id).cloned()
    }

    fn column_infos(&self, table: TableInfoId) -> Vec<ColumnInfo> {
        self.columns
            .values()
            .filter(|c| c.table_id() == table)
            .cloned()
            .collect()
    }

    fn join_infos_between(&self, a: TableInfoId, b: TableInfoId) -> Vec<JoinInfo> {
        self.joins.iter().filter(|j| j.connects(a, b)).cloned().collect()
    }

    fn lookups_with_description(&self, column: ColumnInfoId) -> Vec<Lookup> {
        self.lookups
            .iter()
            .filter(|l| l.description.id == column)
            .cloned()
            .collect()
    }

    /// Also includes joins and lookups reaching tables outside `tables`
    fn relationships_for(&self, tables: &[TableInfoId]) -> Relationships {
        let touches = |t: TableInfoId| tables.contains(&t);

        let joins = self
            .joins
            .iter()
            .filter(|j| touches(j.foreign_key_table()) || touches(j.primary_key_table()))
            .cloned()
            .collect();

        let lookups = self
            .lookups
            .iter()
            .filter(|l| touches(l.foreign_key.table_id()) || touches(l.lookup_table()))
            .cloned()
            .collect();

        Relationships { joins, lookups }
    }
}
