//! Extraction query assembly
//!
//! [`QueryBuilder`] collects columns, relationships, filters, parameters and custom lines and
//! turns them into one SQL SELECT statement. The generated SQL is cached: it is produced on
//! the first call to [`QueryBuilder::build`] and reused until any input changes, at which
//! point the builder drops back to the unbuilt state.
//!
//! Layout of the generated statement:
//!
//! ```text
//! DECLARE/SET parameter lines
//! SELECT
//! [DISTINCT]
//! [TOP n]
//! columns...
//! FROM
//! anchor table
//! JOINs, then lookup JOINs, then custom join lines
//! [WHERE filters AND custom where lines]
//! custom postfix lines
//! [LIMIT n]
//! ```

use super::column::{with_alias, IdentifierSubstitution, QueryColumn};
use super::filter::{merge_parameters, CustomLine, FilterContainer, QueryComponent, SqlParameter};
use super::joins::{resolve_joins, ResolvedJoin};
use super::lookups::{resolve_lookups, LookupAlias};
use crate::catalogue::{CatalogueRepository, Relationships, TableInfo};
use crate::checks::{CheckEvent, CheckNotifier};
use crate::domain::{QueryBuildingError, Result, TableInfoId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// SQL flavour used for row limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// `SELECT TOP n`
    #[default]
    SqlServer,

    /// trailing `LIMIT n`
    PostgreSql,
}

/// Result of a successful build
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub anchor: Arc<TableInfo>,
    pub tables: Vec<Arc<TableInfo>>,
    pub joins: Vec<ResolvedJoin>,
    pub lookup_aliases: Vec<LookupAlias>,
    pub parameters: Vec<SqlParameter>,
}

/// Assembles extraction SQL from catalogue columns and relationships
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    columns: Vec<QueryColumn>,
    relationships: Relationships,
    filter: Option<FilterContainer>,
    custom_lines: Vec<CustomLine>,
    parameters: Vec<SqlParameter>,
    top_x: Option<u32>,
    distinct: bool,
    dialect: SqlDialect,
    identifier_substitution: Option<IdentifierSubstitution>,

    /// The cached build, `None` while unbuilt
    built: Option<Box<BuiltQuery>>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn columns(&self) -> &[QueryColumn] {
        &self.columns
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    /// Forces the next [`build`](Self::build) to regenerate the SQL
    pub fn invalidate(&mut self) {
        self.built = None;
    }

    pub fn add_column(&mut self, column: QueryColumn) {
        self.columns.push(column);
        self.invalidate();
    }

    pub fn add_columns(&mut self, columns: impl IntoIterator<Item = QueryColumn>) {
        self.columns.extend(columns);
        self.invalidate();
    }

    pub fn set_relationships(&mut self, relationships: Relationships) {
        self.relationships = relationships;
        self.invalidate();
    }

    /// Replaces the relationships with everything the repository declares for the current
    /// columns' tables
    pub fn load_relationships(&mut self, repository: &dyn CatalogueRepository) {
        let mut tables: Vec<TableInfoId> = Vec::new();
        for column in &self.columns {
            if !tables.contains(&column.table_id()) {
                tables.push(column.table_id());
            }
        }
        self.set_relationships(repository.relationships_for(&tables));
    }

    pub fn set_filter(&mut self, filter: Option<FilterContainer>) {
        self.filter = filter;
        self.invalidate();
    }

    pub fn add_custom_line(&mut self, line: CustomLine) {
        self.custom_lines.push(line);
        self.invalidate();
    }

    pub fn add_parameter(&mut self, parameter: SqlParameter) {
        self.parameters.push(parameter);
        self.invalidate();
    }

    pub fn set_top_x(&mut self, top_x: Option<u32>) {
        self.top_x = top_x;
        self.invalidate();
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
        self.invalidate();
    }

    pub fn set_dialect(&mut self, dialect: SqlDialect) {
        self.dialect = dialect;
        self.invalidate();
    }

    pub fn set_identifier_substitution(&mut self, substitution: Option<IdentifierSubstitution>) {
        self.identifier_substitution = substitution;
        self.invalidate();
    }

    /// Builds the query, or returns the cached result if nothing changed since the last build
    ///
    /// A failed build leaves the builder unbuilt so the next call retries.
    pub fn build(&mut self) -> std::result::Result<&BuiltQuery, QueryBuildingError> {
        let built = match self.built.take() {
            Some(built) => built,
            None => {
                let built = self.assemble()?;
                crate::log_query_built!(
                    built.tables.len(),
                    built.joins.len(),
                    built.lookup_aliases.len(),
                    built.sql.len()
                );
                Box::new(built)
            }
        };

        let built: &BuiltQuery = self.built.insert(built);
        Ok(built)
    }

    /// The generated SQL text
    pub fn sql(&mut self) -> std::result::Result<&str, QueryBuildingError> {
        Ok(self.build()?.sql.as_str())
    }

    /// Reports whether the query is extractable
    ///
    /// Warns when no extraction identifier is selected, fails when more than one is, and
    /// reports any build error as a failure.
    pub fn check(&mut self, notifier: &dyn CheckNotifier) -> Result<()> {
        let identifiers: Vec<&QueryColumn> = self
            .columns
            .iter()
            .filter(|c| c.is_extraction_identifier)
            .collect();

        match identifiers.as_slice() {
            [] => notifier.on_check_performed(CheckEvent::warning(
                "No extraction identifier column has been selected",
            ))?,
            [_] => {}
            many => notifier.on_check_performed(CheckEvent::fail(format!(
                "There are {} columns marked as extraction identifier ({}), only one is allowed",
                many.len(),
                many.iter().map(|c| c.describe()).collect::<Vec<_>>().join(", ")
            )))?,
        }

        match self.build() {
            Ok(built) => {
                let message = format!(
                    "Query built successfully across {} table(s) with {} join(s) and {} lookup(s)",
                    built.tables.len(),
                    built.joins.len(),
                    built.lookup_aliases.len()
                );
                notifier.on_check_performed(CheckEvent::success(message))
            }
            Err(e) => notifier.on_check_performed(CheckEvent::fail(e.to_string())),
        }
    }

    fn assemble(&self) -> std::result::Result<BuiltQuery, QueryBuildingError> {
        if self.columns.is_empty() {
            return Err(QueryBuildingError::NoColumns);
        }

        let mut ordered: Vec<&QueryColumn> = self.columns.iter().collect();
        ordered.sort_by_key(|c| c.order);

        let lookups = resolve_lookups(&ordered, &self.relationships);

        let mut tables: Vec<Arc<TableInfo>> = Vec::new();
        let mut require = |table: &Arc<TableInfo>| {
            if !tables.iter().any(|t| t.id == table.id) {
                tables.push(table.clone());
            }
        };
        for (column, alias) in ordered.iter().zip(&lookups.column_aliases) {
            if alias.is_none() {
                require(&column.column.table);
            }
        }
        for alias in &lookups.aliases {
            require(&alias.lookup.foreign_key.table);
        }

        let plan = resolve_joins(&tables, &self.relationships)?;

        let select_lines = self.select_lines(&ordered, &lookups.column_aliases, &lookups.aliases)?;

        let filter_parameters = self
            .filter
            .as_ref()
            .map(FilterContainer::parameters)
            .unwrap_or_default();
        let parameters = merge_parameters(self.parameters.iter().chain(filter_parameters))?;

        let mut sql = String::new();
        for parameter in &parameters {
            push_line(&mut sql, &parameter.declaration_sql());
            push_line(&mut sql, &parameter.value_sql());
        }

        push_line(&mut sql, "SELECT");
        if self.distinct {
            push_line(&mut sql, "DISTINCT");
        }
        if let (Some(top_x), SqlDialect::SqlServer) = (self.top_x, self.dialect) {
            push_line(&mut sql, &format!("TOP {top_x}"));
        }
        push_line(&mut sql, &select_lines.join(",\n"));

        push_line(&mut sql, "FROM");
        push_line(&mut sql, &plan.anchor.name);
        for join in &plan.joins {
            push_line(&mut sql, &join.to_sql());
        }
        for alias in &lookups.aliases {
            push_line(&mut sql, &alias.join_sql());
        }
        for line in self.custom_lines_at(QueryComponent::JoinInfoJoin) {
            push_line(&mut sql, line);
        }

        let mut where_parts: Vec<String> = Vec::new();
        if let Some(filter_sql) = self.filter.as_ref().and_then(FilterContainer::to_sql) {
            where_parts.push(filter_sql);
        }
        where_parts.extend(self.custom_lines_at(QueryComponent::Where).map(str::to_string));
        if !where_parts.is_empty() {
            push_line(&mut sql, "WHERE");
            push_line(&mut sql, &where_parts.join("\nAND\n"));
        }

        for line in self.custom_lines_at(QueryComponent::Postfix) {
            push_line(&mut sql, line);
        }
        if let (Some(top_x), SqlDialect::PostgreSql) = (self.top_x, self.dialect) {
            push_line(&mut sql, &format!("LIMIT {top_x}"));
        }

        let trimmed = sql.trim_end().len();
        sql.truncate(trimmed);

        Ok(BuiltQuery {
            sql,
            anchor: plan.anchor,
            tables: plan.tables,
            joins: plan.joins,
            lookup_aliases: lookups.aliases,
            parameters,
        })
    }

    fn select_lines(
        &self,
        ordered: &[&QueryColumn],
        column_aliases: &[Option<usize>],
        aliases: &[LookupAlias],
    ) -> std::result::Result<Vec<String>, QueryBuildingError> {
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut lines = Vec::with_capacity(ordered.len());

        for (column, alias_index) in ordered.iter().zip(column_aliases) {
            let (expression, output_alias) = match (alias_index, &self.identifier_substitution) {
                (Some(index), _) => {
                    let lookup_alias = &aliases[*index].alias;
                    let expression = match &column.select_sql {
                        Some(sql) if !sql.trim().is_empty() => sql.trim().replace(
                            &format!("{}.", column.column.table.name),
                            &format!("{lookup_alias}."),
                        ),
                        _ => column.column.aliased_name(lookup_alias),
                    };
                    (expression, column.alias.clone())
                }
                (None, Some(substitution)) if column.is_extraction_identifier => (
                    substitution.select_sql.clone(),
                    Some(substitution.alias.clone()),
                ),
                _ => (column.select_expression(), column.alias.clone()),
            };

            let output_name = output_alias
                .clone()
                .unwrap_or_else(|| column.column.name.clone());
            let described = with_alias(&expression, output_alias.as_deref());

            if let Some(first) = seen.get(&output_name.to_lowercase()) {
                return Err(QueryBuildingError::DuplicateOutputColumn {
                    name: output_name,
                    first: first.clone(),
                    second: described,
                });
            }
            seen.insert(output_name.to_lowercase(), described.clone());
            lines.push(described);
        }

        lines.extend(self.custom_lines_at(QueryComponent::Select).map(str::to_string));
        Ok(lines)
    }

    fn custom_lines_at(&self, location: QueryComponent) -> impl Iterator<Item = &str> {
        self.custom_lines
            .iter()
            .filter(move |l| l.location == location)
            .map(|l| l.text.as_str())
    }
}

fn push_line(sql: &mut String, line: &str) {
    sql.push_str(line);
    sql.push('\n');
}

/// One-shot build without keeping a builder around
pub fn build_sql(
    columns: impl IntoIterator<Item = QueryColumn>,
    relationships: Relationships,
    filter: Option<FilterContainer>,
    custom_lines: impl IntoIterator<Item = CustomLine>,
) -> std::result::Result<String, QueryBuildingError> {
    let mut builder = QueryBuilder::new();
    builder.add_columns(columns);
    builder.set_relationships(relationships);
    builder.set_filter(filter);
    for line in custom_lines {
        builder.add_custom_line(line);
    }
    Ok(builder.build()?.sql.clone())
}
