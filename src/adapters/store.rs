//! Mapping store abstraction
//!
//! The ANO server keeps one table per [`AnoTable`] holding the permanent real value to
//! anonymous value mapping. Everything the transformer and the push operation need from it
//! goes through [`AnoMappingStore`].

use crate::anonymisation::AnoTable;
use crate::domain::{AnoError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// One column of a mapping table as reported by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingColumn {
    pub name: String,
    pub data_type: String,
}

impl MappingColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Physical shape of a mapping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTableSchema {
    pub table_name: String,
    pub columns: Vec<MappingColumn>,
}

impl MappingTableSchema {
    /// The shape `table` should have once pushed with `identifiable_type`
    pub fn expected(table: &AnoTable, identifiable_type: &str) -> Self {
        Self {
            table_name: table.table_name.clone(),
            columns: vec![
                MappingColumn::new(table.identifiable_column_name(), identifiable_type.trim()),
                MappingColumn::new(table.anonymous_column_name(), table.anonymous_data_type()),
            ],
        }
    }

    /// Human readable differences between `self` (expected) and `actual`, empty when they match
    pub fn differences(&self, actual: &MappingTableSchema) -> Vec<String> {
        let mut differences = Vec::new();

        for expected in &self.columns {
            match actual
                .columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&expected.name))
            {
                None => differences.push(format!("column {} is missing", expected.name)),
                Some(found)
                    if normalise_data_type(&found.data_type)
                        != normalise_data_type(&expected.data_type) =>
                {
                    differences.push(format!(
                        "column {} is {} but should be {}",
                        expected.name, found.data_type, expected.data_type
                    ))
                }
                Some(_) => {}
            }
        }

        for found in &actual.columns {
            if !self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(&found.name)) {
                differences.push(format!("unexpected column {}", found.name));
            }
        }

        differences
    }
}

/// Canonical form of a SQL type name so `VARCHAR (10)` and `character varying(10)` compare equal
pub fn normalise_data_type(data_type: &str) -> String {
    let lowered = data_type.trim().to_lowercase();
    let (base, size) = match lowered.find('(') {
        Some(index) => (lowered[..index].trim(), lowered[index..].replace(' ', "")),
        None => (lowered.as_str(), String::new()),
    };

    let base = match base {
        "character varying" | "nvarchar" => "varchar",
        "character" | "nchar" | "bpchar" => "char",
        "integer" | "int4" => "int",
        "int8" => "bigint",
        "int2" => "smallint",
        "numeric" => "decimal",
        other => other,
    };

    format!("{base}{size}")
}

/// Declared length of a `varchar(n)` or `char(n)` type, `None` for other types
pub fn character_length_limit(data_type: &str) -> Option<usize> {
    let normalised = normalise_data_type(data_type);
    let size = normalised
        .strip_prefix("varchar(")
        .or_else(|| normalised.strip_prefix("char("))?;
    size.strip_suffix(')')?.parse().ok()
}

/// Fails if `real_value` is longer than the identifiable column of `table` can hold
///
/// Databases silently truncate over-length strings cast to `varchar(n)`, which would merge two
/// real values onto one mapping.
pub fn check_real_value_fits(
    table: &AnoTable,
    identifiable_type: &str,
    real_value: &str,
) -> Result<()> {
    let Some(max) = character_length_limit(identifiable_type) else {
        return Ok(());
    };

    let length = real_value.chars().count();
    if length > max {
        return Err(AnoError::RealValueTooLong {
            table: table.table_name.clone(),
            length,
            max,
        }
        .into());
    }
    Ok(())
}

/// Result of trying to record one new mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,

    /// Another real value already owns this anonymous value; generate a new one
    AnonymousValueTaken,

    /// A concurrent writer mapped this real value first; carries its anonymous value
    RealValueAlreadyMapped(String),
}

/// Persistent real to anonymous value mappings
#[async_trait]
pub trait AnoMappingStore: Send + Sync {
    /// Shape of the mapping table, `None` if it has not been created
    async fn describe_table(&self, table: &AnoTable) -> Result<Option<MappingTableSchema>>;

    /// Creates the mapping table
    async fn create_table(&self, table: &AnoTable, identifiable_type: &str) -> Result<()>;

    /// Existing mappings for `real_values`; values without a mapping are absent from the result
    async fn lookup(
        &self,
        table: &AnoTable,
        real_values: &[String],
    ) -> Result<HashMap<String, String>>;

    /// Records `real_value -> anonymous_value` unless either side is already taken
    async fn insert(
        &self,
        table: &AnoTable,
        real_value: &str,
        anonymous_value: &str,
    ) -> Result<InsertOutcome>;

    /// Name used in logs
    fn store_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnoTableId;
    use test_case::test_case;

    #[test_case("varchar(10)", "VARCHAR (10)" ; "case and space")]
    #[test_case("varchar(10)", "character varying(10)" ; "postgres long form")]
    #[test_case("int", "integer" ; "integer")]
    #[test_case("decimal(8,2)", "numeric(8, 2)" ; "numeric")]
    fn test_equivalent_types(a: &str, b: &str) {
        assert_eq!(normalise_data_type(a), normalise_data_type(b));
    }

    #[test_case("varchar(10)", Some(10))]
    #[test_case("character varying (12)", Some(12))]
    #[test_case("char(3)", Some(3))]
    #[test_case("int", None)]
    #[test_case("decimal(8,2)", None)]
    #[test_case("varchar(max)", None)]
    fn test_character_length_limit(data_type: &str, expected: Option<usize>) {
        assert_eq!(character_length_limit(data_type), expected);
    }

    #[test]
    fn test_over_length_real_value_rejected() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        assert!(check_real_value_fits(&table, "varchar(10)", "0101010101").is_ok());
        assert!(check_real_value_fits(&table, "int", "01010101011").is_ok());

        let err = check_real_value_fits(&table, "varchar(10)", "01010101011").unwrap_err();
        assert!(matches!(
            err,
            crate::domain::RdmpError::Anonymisation(AnoError::RealValueTooLong {
                length: 11,
                max: 10,
                ..
            })
        ));
        assert!(!err.to_string().contains("01010101011"));
    }

    #[test]
    fn test_schema_differences() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        let expected = MappingTableSchema::expected(&table, "varchar(10)");

        assert!(expected.differences(&expected.clone()).is_empty());

        let actual = MappingTableSchema {
            table_name: "ANOCHI".to_string(),
            columns: vec![
                MappingColumn::new("chi", "varchar(9)"),
                MappingColumn::new("extra", "int"),
            ],
        };
        let differences = expected.differences(&actual);
        assert_eq!(
            differences,
            vec![
                "column CHI is varchar(9) but should be varchar(10)".to_string(),
                "column ANOCHI is missing".to_string(),
                "unexpected column extra".to_string(),
            ]
        );
    }
}
