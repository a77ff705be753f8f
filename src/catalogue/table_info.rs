//! Tables and columns as recorded in the catalogue

use crate::domain::{ColumnInfoId, TableInfoId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A physical table registered in the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: TableInfoId,

    /// Fully qualified table name as it should appear in SQL (e.g. `[biochem]..[Tests]`)
    pub name: String,

    /// Database the table lives in, if different from the connection default
    #[serde(default)]
    pub database: Option<String>,

    /// Forces this table to be the FROM table when several tables are joined
    #[serde(default)]
    pub is_primary_extraction_table: bool,
}

impl TableInfo {
    pub fn new(id: TableInfoId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            database: None,
            is_primary_extraction_table: false,
        }
    }

    /// Marks the table as the primary extraction table
    pub fn primary(mut self) -> Self {
        self.is_primary_extraction_table = true;
        self
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A column of a [`TableInfo`]
///
/// Columns hold a shared reference to their table so the query builder can tell which table
/// every requested column originates from without consulting the repository again.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub id: ColumnInfoId,
    pub table: Arc<TableInfo>,

    /// Unqualified column name
    pub name: String,

    /// Physical SQL data type, e.g. `varchar(10)`
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(
        id: ColumnInfoId,
        table: Arc<TableInfo>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            table,
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn table_id(&self) -> TableInfoId {
        self.table.id
    }

    /// `<table>.<column>`
    pub fn fully_qualified_name(&self) -> String {
        format!("{}.{}", self.table.name, self.name)
    }

    /// The column qualified by a table alias instead of the table name
    pub fn aliased_name(&self, table_alias: &str) -> String {
        format!("{}.{}", table_alias, self.name)
    }
}

impl PartialEq for ColumnInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ColumnInfo {}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fully_qualified_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn biochem() -> Arc<TableInfo> {
        Arc::new(TableInfo::new(TableInfoId::new(1), "[biochem]..[Tests]"))
    }

    #[test]
    fn test_fully_qualified_name() {
        let column = ColumnInfo::new(ColumnInfoId::new(1), biochem(), "chi", "varchar(10)");
        assert_eq!(column.fully_qualified_name(), "[biochem]..[Tests].chi");
        assert_eq!(column.aliased_name("lookup_1"), "lookup_1.chi");
    }

    #[test]
    fn test_columns_compare_by_id() {
        let table = biochem();
        let a = ColumnInfo::new(ColumnInfoId::new(1), table.clone(), "chi", "varchar(10)");
        let b = ColumnInfo::new(ColumnInfoId::new(1), table, "renamed", "int");
        assert_eq!(a, b);
    }

    #[test]
    fn test_primary_builder() {
        let table = TableInfo::new(TableInfoId::new(2), "Demography").primary();
        assert!(table.is_primary_extraction_table);
        assert_eq!(table.to_string(), "Demography");
    }
}
