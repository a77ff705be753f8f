//! TOML description of a query, used by the `build-sql` command
//!
//! ```toml
//! dialect = "sqlserver"
//! top_x = 100
//!
//! [[tables]]
//! name = "Tests"
//! primary = true
//! columns = [{ name = "chi", data_type = "varchar(10)" }, { name = "code" }]
//!
//! [[tables]]
//! name = "Codes"
//! columns = [{ name = "code" }, { name = "description" }]
//!
//! [[lookups]]
//! description = "Codes.description"
//! foreign_key = "Tests.code"
//! primary_key = "Codes.code"
//!
//! [[select]]
//! column = "Tests.chi"
//! extraction_identifier = true
//!
//! [[select]]
//! column = "Codes.description"
//! order = 1
//! ```

use super::builder::{QueryBuilder, SqlDialect};
use super::column::{IdentifierSubstitution, QueryColumn};
use super::filter::{CustomLine, FilterContainer, SqlParameter};
use crate::catalogue::{ColumnInfo, ExtractionJoinType, JoinInfo, Lookup, MemoryCatalogue, TableInfo};
use crate::domain::{ColumnInfoId, LookupId, RdmpError, Result, TableInfoId};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryDocument {
    #[serde(default)]
    pub dialect: SqlDialect,

    #[serde(default)]
    pub top_x: Option<u32>,

    #[serde(default)]
    pub distinct: bool,

    pub tables: Vec<TableDefinition>,

    #[serde(default)]
    pub joins: Vec<JoinDefinition>,

    #[serde(default)]
    pub lookups: Vec<LookupDefinition>,

    pub select: Vec<SelectDefinition>,

    #[serde(default)]
    pub filter: Option<FilterContainer>,

    #[serde(default)]
    pub parameters: Vec<SqlParameter>,

    #[serde(default)]
    pub custom_lines: Vec<CustomLine>,

    #[serde(default)]
    pub identifier_substitution: Option<IdentifierSubstitution>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableDefinition {
    pub name: String,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub primary: bool,

    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,

    #[serde(default = "default_data_type")]
    pub data_type: String,
}

fn default_data_type() -> String {
    "varchar(max)".to_string()
}

/// Columns are referenced as `"Table.column"`
#[derive(Debug, Clone, Deserialize)]
pub struct JoinDefinition {
    pub foreign_key: String,
    pub primary_key: String,

    #[serde(default)]
    pub join_type: ExtractionJoinType,

    #[serde(default)]
    pub collation: Option<String>,

    #[serde(default)]
    pub extra_on_sql: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupDefinition {
    pub description: String,
    pub foreign_key: String,
    pub primary_key: String,

    #[serde(default)]
    pub join_type: ExtractionJoinType,

    #[serde(default)]
    pub collation: Option<String>,

    /// Extra `[foreign_key, primary_key]` pairs
    #[serde(default)]
    pub composite_keys: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectDefinition {
    pub column: String,

    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub select_sql: Option<String>,

    #[serde(default)]
    pub extraction_identifier: bool,

    #[serde(default)]
    pub order: i32,
}

impl QueryDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RdmpError::Configuration(format!(
                "Failed to read query file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Registers every table and column, resolves the references and returns a builder loaded
    /// with the selected columns and their relationships
    pub fn into_builder(self) -> Result<QueryBuilder> {
        let mut catalogue = MemoryCatalogue::new();
        let mut next_column = 1u32;

        for (index, definition) in self.tables.iter().enumerate() {
            let mut table = TableInfo::new(TableInfoId::new(index as u32 + 1), &definition.name);
            table.database = definition.database.clone();
            table.is_primary_extraction_table = definition.primary;
            let table = catalogue.add_table(table);

            for column in &definition.columns {
                catalogue.add_column(
                    ColumnInfoId::new(next_column),
                    table.id,
                    &column.name,
                    &column.data_type,
                )?;
                next_column += 1;
            }
        }

        for join in &self.joins {
            let mut info = JoinInfo::new(
                resolve(&catalogue, &join.foreign_key)?,
                resolve(&catalogue, &join.primary_key)?,
                join.join_type,
            );
            if let Some(collation) = &join.collation {
                info = info.with_collation(collation);
            }
            if let Some(extra) = &join.extra_on_sql {
                info = info.with_extra_on_sql(extra);
            }
            catalogue.add_join(info);
        }

        for (index, lookup) in self.lookups.iter().enumerate() {
            let mut built = Lookup::new(
                LookupId::new(index as u32 + 1),
                resolve(&catalogue, &lookup.description)?,
                resolve(&catalogue, &lookup.foreign_key)?,
                resolve(&catalogue, &lookup.primary_key)?,
            )
            .with_join_type(lookup.join_type);
            if let Some(collation) = &lookup.collation {
                built = built.with_collation(collation);
            }
            for [foreign_key, primary_key] in &lookup.composite_keys {
                built = built.with_composite_key(
                    resolve(&catalogue, foreign_key)?,
                    resolve(&catalogue, primary_key)?,
                );
            }
            catalogue.add_lookup(built);
        }

        let mut builder = QueryBuilder::with_dialect(self.dialect);
        for select in &self.select {
            let mut column = QueryColumn::new(resolve(&catalogue, &select.column)?).with_order(select.order);
            if let Some(alias) = &select.alias {
                column = column.with_alias(alias);
            }
            if let Some(sql) = &select.select_sql {
                column = column.with_select_sql(sql);
            }
            if select.extraction_identifier {
                column = column.extraction_identifier();
            }
            builder.add_column(column);
        }

        builder.load_relationships(&catalogue);
        builder.set_filter(self.filter);
        builder.set_top_x(self.top_x);
        builder.set_distinct(self.distinct);
        builder.set_identifier_substitution(self.identifier_substitution);
        for parameter in self.parameters {
            builder.add_parameter(parameter);
        }
        for line in self.custom_lines {
            builder.add_custom_line(line);
        }

        Ok(builder)
    }
}

fn resolve(catalogue: &MemoryCatalogue, reference: &str) -> Result<ColumnInfo> {
    let (table, column) = reference.rsplit_once('.').ok_or_else(|| {
        RdmpError::Configuration(format!(
            "Column reference '{reference}' must be written as Table.column"
        ))
    })?;

    catalogue
        .find_column(table, column)
        .cloned()
        .ok_or_else(|| RdmpError::Configuration(format!("Unknown column '{reference}'")))
}
