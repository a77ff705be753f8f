//! Columns requested from the query builder

use crate::catalogue::ColumnInfo;
use crate::domain::TableInfoId;
use serde::{Deserialize, Serialize};

/// One selectable output column
///
/// Wraps the underlying [`ColumnInfo`] with the extraction-time settings: an optional
/// transform expression, an optional alias, the extraction identifier flag and the output
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryColumn {
    pub column: ColumnInfo,

    /// Transform SQL to select instead of the raw column
    pub select_sql: Option<String>,

    pub alias: Option<String>,

    /// Marks the column whose values are replaced by release identifiers
    pub is_extraction_identifier: bool,

    pub order: i32,
}

impl QueryColumn {
    pub fn new(column: ColumnInfo) -> Self {
        Self {
            column,
            select_sql: None,
            alias: None,
            is_extraction_identifier: false,
            order: 0,
        }
    }

    pub fn with_select_sql(mut self, sql: impl Into<String>) -> Self {
        self.select_sql = Some(sql.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn extraction_identifier(mut self) -> Self {
        self.is_extraction_identifier = true;
        self
    }

    pub fn table_id(&self) -> TableInfoId {
        self.column.table_id()
    }

    /// The column name the result set will carry
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column.name)
    }

    /// The expression selected for this column before any lookup or identifier substitution
    pub fn select_expression(&self) -> String {
        match &self.select_sql {
            Some(sql) if !sql.trim().is_empty() => sql.trim().to_string(),
            _ => self.column.fully_qualified_name(),
        }
    }

    /// Human readable description used in diagnostics
    pub fn describe(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} (as {})", self.select_expression(), alias),
            None => self.select_expression(),
        }
    }
}

/// Replacement SQL for the extraction identifier column, supplied by the cohort linkage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierSubstitution {
    /// e.g. `[cohort]..[Cohort].ReleaseID`
    pub select_sql: String,
    pub alias: String,
}

impl IdentifierSubstitution {
    pub fn new(select_sql: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            select_sql: select_sql.into(),
            alias: alias.into(),
        }
    }
}

/// Renders `expr` or `expr AS alias`
pub(crate) fn with_alias(expression: &str, alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("{expression} AS {alias}"),
        None => expression.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::TableInfo;
    use crate::domain::{ColumnInfoId, TableInfoId};
    use std::sync::Arc;

    fn chi() -> ColumnInfo {
        let table = Arc::new(TableInfo::new(TableInfoId::new(1), "Demography"));
        ColumnInfo::new(ColumnInfoId::new(1), table, "chi", "varchar(10)")
    }

    #[test]
    fn test_output_name_prefers_alias() {
        let column = QueryColumn::new(chi());
        assert_eq!(column.output_name(), "chi");
        assert_eq!(column.with_alias("PatientId").output_name(), "PatientId");
    }

    #[test]
    fn test_select_expression_uses_transform() {
        let column = QueryColumn::new(chi()).with_select_sql("  UPPER(Demography.chi) ");
        assert_eq!(column.select_expression(), "UPPER(Demography.chi)");

        let blank = QueryColumn::new(chi()).with_select_sql("  ");
        assert_eq!(blank.select_expression(), "Demography.chi");
    }

    #[test]
    fn test_with_alias_rendering() {
        assert_eq!(with_alias("a.b", Some("c")), "a.b AS c");
        assert_eq!(with_alias("a.b", None), "a.b");
    }
}
