//! WHERE clause containers, parameters and caller supplied custom lines

use crate::domain::QueryBuildingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How the members of a [`FilterContainer`] are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperation {
    #[default]
    And,
    Or,
}

impl fmt::Display for FilterOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// A SQL parameter declared at the top of the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlParameter {
    /// Parameter name including the `@`
    pub name: String,
    pub data_type: String,

    /// Literal SQL value, already quoted where needed
    pub value: String,
}

impl SqlParameter {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.starts_with('@') {
            name
        } else {
            format!("@{name}")
        };
        Self {
            name,
            data_type: data_type.into(),
            value: value.into(),
        }
    }

    pub fn declaration_sql(&self) -> String {
        format!("DECLARE {} AS {};", self.name, self.data_type)
    }

    pub fn value_sql(&self) -> String {
        format!("SET {}={};", self.name, self.value)
    }
}

/// A single WHERE condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub where_sql: String,
    #[serde(default)]
    pub parameters: Vec<SqlParameter>,
}

impl Filter {
    pub fn new(name: impl Into<String>, where_sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            where_sql: where_sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: SqlParameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// A tree of filters combined with AND/OR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterContainer {
    #[serde(default)]
    pub operation: FilterOperation,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub subcontainers: Vec<FilterContainer>,
}

impl FilterContainer {
    pub fn new(operation: FilterOperation) -> Self {
        Self {
            operation,
            filters: Vec::new(),
            subcontainers: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_subcontainer(mut self, container: FilterContainer) -> Self {
        self.subcontainers.push(container);
        self
    }

    /// True if neither this container nor any descendant holds a filter
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.subcontainers.iter().all(FilterContainer::is_empty)
    }

    /// Renders the container as a parenthesised block, `None` when empty
    pub fn to_sql(&self) -> Option<String> {
        let mut parts: Vec<String> = self
            .filters
            .iter()
            .map(|f| f.where_sql.trim().to_string())
            .filter(|sql| !sql.is_empty())
            .collect();
        parts.extend(self.subcontainers.iter().filter_map(FilterContainer::to_sql));

        if parts.is_empty() {
            return None;
        }

        let separator = format!("\n{}\n", self.operation);
        Some(format!("(\n{}\n)", parts.join(&separator)))
    }

    /// Every parameter carried by filters in this tree, depth first
    pub fn parameters(&self) -> Vec<&SqlParameter> {
        let mut all: Vec<&SqlParameter> = self.filters.iter().flat_map(|f| f.parameters.iter()).collect();
        for container in &self.subcontainers {
            all.extend(container.parameters());
        }
        all
    }
}

/// Where in the assembled query a [`CustomLine`] is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComponent {
    /// Extra entries at the end of the SELECT list
    Select,
    /// After the resolved joins (e.g. the cohort join)
    JoinInfoJoin,
    /// ANDed into the WHERE clause (e.g. the cohort WHERE)
    Where,
    /// After everything else
    Postfix,
}

/// Caller supplied SQL inserted at a fixed slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLine {
    pub text: String,
    pub location: QueryComponent,
}

impl CustomLine {
    pub fn new(text: impl Into<String>, location: QueryComponent) -> Self {
        Self {
            text: text.into(),
            location,
        }
    }
}

/// Merges parameters by name, rejecting conflicting redeclarations
pub(crate) fn merge_parameters<'a>(
    parameters: impl IntoIterator<Item = &'a SqlParameter>,
) -> Result<Vec<SqlParameter>, QueryBuildingError> {
    let mut merged: BTreeMap<String, SqlParameter> = BTreeMap::new();
    let mut order = Vec::new();

    for parameter in parameters {
        let key = parameter.name.to_lowercase();
        match merged.get(&key) {
            Some(existing) if existing != parameter => {
                return Err(QueryBuildingError::ParameterConflict {
                    name: parameter.name.clone(),
                    first: format!("{} {}", existing.declaration_sql(), existing.value_sql()),
                    second: format!("{} {}", parameter.declaration_sql(), parameter.value_sql()),
                });
            }
            Some(_) => {}
            None => {
                order.push(key.clone());
                merged.insert(key, parameter.clone());
            }
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_container_renders_nothing() {
        let container = FilterContainer::new(FilterOperation::And)
            .with_subcontainer(FilterContainer::new(FilterOperation::Or));
        assert!(container.is_empty());
        assert_eq!(container.to_sql(), None);
    }

    #[test]
    fn test_nested_container_rendering() {
        let container = FilterContainer::new(FilterOperation::And)
            .with_filter(Filter::new("adults", "Demography.age >= 18"))
            .with_subcontainer(
                FilterContainer::new(FilterOperation::Or)
                    .with_filter(Filter::new("male", "Demography.sex = 'M'"))
                    .with_filter(Filter::new("female", "Demography.sex = 'F'")),
            );

        assert_eq!(
            container.to_sql().unwrap(),
            "(\nDemography.age >= 18\nAND\n(\nDemography.sex = 'M'\nOR\nDemography.sex = 'F'\n)\n)"
        );
    }

    #[test]
    fn test_parameter_rendering_adds_at_sign() {
        let parameter = SqlParameter::new("code", "varchar(10)", "'HBA1C'");
        assert_eq!(parameter.declaration_sql(), "DECLARE @code AS varchar(10);");
        assert_eq!(parameter.value_sql(), "SET @code='HBA1C';");
    }

    #[test]
    fn test_merge_parameters_deduplicates_identical() {
        let a = SqlParameter::new("@code", "varchar(10)", "'X'");
        let b = SqlParameter::new("@code", "varchar(10)", "'X'");
        let merged = merge_parameters([&a, &b]).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_parameters_rejects_conflicts() {
        let a = SqlParameter::new("@code", "varchar(10)", "'X'");
        let b = SqlParameter::new("@CODE", "varchar(10)", "'Y'");
        let err = merge_parameters([&a, &b]).unwrap_err();
        assert!(matches!(err, QueryBuildingError::ParameterConflict { .. }));
    }
}
