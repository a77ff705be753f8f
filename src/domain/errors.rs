//! Domain error types
//!
//! This module defines the error hierarchy for RDMP. Errors raised by the query builder and
//! the anonymisation engine have their own enums so callers can match on the failure kind,
//! while [`RdmpError`] wraps everything that crosses a module boundary.

use thiserror::Error;

/// Main RDMP error type
#[derive(Debug, Error)]
pub enum RdmpError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Query assembly failures (unjoinable tables, ambiguous joins, ...)
    #[error("Query building error: {0}")]
    QueryBuilding(#[from] QueryBuildingError),

    /// ANO table configuration and substitution failures
    #[error("Anonymisation error: {0}")]
    Anonymisation(#[from] AnoError),

    /// Mapping store errors
    #[error("Database error: {0}")]
    Database(String),

    /// A check reported through a strict notifier failed
    #[error("Check failed: {0}")]
    Check(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Failures detected while resolving joins and assembling extraction SQL
///
/// Every variant carries enough context (table and column names) to diagnose the broken
/// configuration without consulting logs. None of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryBuildingError {
    /// The builder has no columns
    #[error("Cannot build query because no columns have been added to the QueryBuilder")]
    NoColumns,

    /// More than one table claims to be the FROM table
    #[error("There are multiple tables marked as IsPrimaryExtractionTable: {tables}")]
    MultiplePrimaryExtractionTables { tables: String },

    /// Some tables could not be reached from the anchor table
    #[error(
        "There were {table_count} Tables involved in assembling this query ({tables}) but no JoinInfo path \
         could be found to join {unjoined} to {anchor}. Among the relationships declared for these tables \
         there were {lookup_count} Lookups and {join_count} JoinInfos"
    )]
    UnjoinedTables {
        table_count: usize,
        tables: String,
        anchor: String,
        unjoined: String,
        lookup_count: usize,
        join_count: usize,
    },

    /// Several joins between the same tables point in different directions
    #[error(
        "Found {count} JoinInfos between tables {left} and {right} but they are declared in different \
         directions ({directions}) which prevents forming a Combo AND based join"
    )]
    ConflictingJoinDirections {
        count: usize,
        left: String,
        right: String,
        directions: String,
    },

    /// Several joins in the same direction disagree on the join type
    #[error(
        "Although joins are all between the same tables in the same direction, the ExtractionJoinTypes are \
         different ({join_types}) which prevents forming a Combo AND based join using all relationships \
         between {left} and {right}"
    )]
    AmbiguousJoinTypes {
        left: String,
        right: String,
        join_types: String,
    },

    /// Two distinct source columns produce the same output column name
    #[error("Duplicate output column name '{name}' produced by both {first} and {second}")]
    DuplicateOutputColumn {
        name: String,
        first: String,
        second: String,
    },

    /// The same parameter was declared twice with different declarations or values
    #[error("Parameter {name} is declared more than once with different values ('{first}' and '{second}')")]
    ParameterConflict {
        name: String,
        first: String,
        second: String,
    },
}

/// ANO table configuration and identifier substitution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnoError {
    #[error("Number of integers to use in anonymous representation cannot be negative (was {0})")]
    NegativeIntegerCount(i32),

    #[error("Number of characters to use in anonymous representation cannot be negative (was {0})")]
    NegativeCharacterCount(i32),

    #[error("Anonymous representations must have at least 1 integer or character")]
    EmptyRepresentation,

    #[error("You must choose a suffix for your ANO identifiers")]
    BlankSuffix,

    #[error("Suffix '{0}' must contain only letters")]
    InvalidSuffix(String),

    #[error("ANOTable name '{0}' must start with ANO followed by at least one letter, digit or underscore")]
    InvalidTableName(String),

    #[error("There is already an ANOTable with the suffix '{suffix}' ({existing})")]
    DuplicateSuffix { suffix: String, existing: String },

    #[error("There is already an ANOTable called '{0}'")]
    DuplicateTableName(String),

    #[error("ANOTable not found: {0}")]
    NotFound(String),

    #[error("'{0}' is not a valid SQL data type for the identifiable column")]
    InvalidIdentifiableType(String),

    #[error("ANOTable '{0}' has not been pushed to the ANO server yet")]
    TableNotPushed(String),

    #[error(
        "A real value of {length} characters does not fit the identifiable column of ANOTable '{table}' (at most {max})"
    )]
    RealValueTooLong { table: String, length: usize, max: usize },

    #[error("Column '{0}' was not found in the batch")]
    ColumnNotFound(String),

    #[error(
        "Gave up generating a unique anonymous identifier for ANOTable '{table}' after {attempts} collisions"
    )]
    CollisionRetriesExhausted { table: String, attempts: usize },
}

impl From<std::io::Error> for RdmpError {
    fn from(err: std::io::Error) -> Self {
        RdmpError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RdmpError {
    fn from(err: serde_json::Error) -> Self {
        RdmpError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for RdmpError {
    fn from(err: toml::de::Error) -> Self {
        RdmpError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdmp_error_display() {
        let err = RdmpError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_query_building_error_conversion() {
        let err: RdmpError = QueryBuildingError::NoColumns.into();
        assert!(matches!(err, RdmpError::QueryBuilding(QueryBuildingError::NoColumns)));
    }

    #[test]
    fn test_ano_error_conversion() {
        let err: RdmpError = AnoError::EmptyRepresentation.into();
        assert!(matches!(err, RdmpError::Anonymisation(_)));
        assert!(err
            .to_string()
            .contains("Anonymous representations must have at least 1 integer or character"));
    }

    #[test]
    fn test_unjoined_tables_message_names_tables() {
        let err = QueryBuildingError::UnjoinedTables {
            table_count: 2,
            tables: "Biochemistry, Prescribing".to_string(),
            anchor: "Biochemistry".to_string(),
            unjoined: "Prescribing".to_string(),
            lookup_count: 1,
            join_count: 0,
        };
        let message = err.to_string();
        assert!(message.contains("Biochemistry"));
        assert!(message.contains("Prescribing"));
        assert!(message.contains("1 Lookups and 0 JoinInfos"));
    }

    #[test]
    fn test_ambiguous_join_types_wording() {
        let err = QueryBuildingError::AmbiguousJoinTypes {
            left: "A".to_string(),
            right: "B".to_string(),
            join_types: "LEFT, RIGHT".to_string(),
        };
        assert!(err.to_string().starts_with(
            "Although joins are all between the same tables in the same direction, the ExtractionJoinTypes are different"
        ));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: RdmpError = io_err.into();
        assert!(matches!(err, RdmpError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: RdmpError = toml_err.into();
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_rdmp_error_implements_std_error() {
        let err = RdmpError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
