//! ANO table configuration
//!
//! An [`AnoTable`] describes one substitution table on the ANO server: a two column table
//! mapping each identifiable value (e.g. a CHI number) to a random anonymous value shaped as
//! `<digits><letters>_<suffix>`.

use crate::domain::{AnoError, AnoTableId, RdmpError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

const ANO_PREFIX: &str = "ANO";

fn table_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^ANO[A-Za-z0-9_]+$").unwrap())
}

fn identifiable_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z]+( ?\(\d+(,\d+)?\))?$").unwrap())
}

/// A configured substitution table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnoTable {
    pub id: AnoTableId,

    /// Must start with `ANO`; also the name of the anonymous column
    pub table_name: String,

    pub integer_count: i32,
    pub character_count: i32,

    /// Appended to every anonymous value after an underscore
    pub suffix: String,
}

impl AnoTable {
    pub fn new(
        id: AnoTableId,
        table_name: impl Into<String>,
        integer_count: i32,
        character_count: i32,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            id,
            table_name: table_name.into(),
            integer_count,
            character_count,
            suffix: suffix.into(),
        }
    }

    /// Save-time validation
    ///
    /// Checks the counts, the suffix and the table name. Suffix uniqueness is the registry's job.
    pub fn validate(&self) -> std::result::Result<(), AnoError> {
        if self.integer_count < 0 {
            return Err(AnoError::NegativeIntegerCount(self.integer_count));
        }
        if self.character_count < 0 {
            return Err(AnoError::NegativeCharacterCount(self.character_count));
        }
        if self.integer_count == 0 && self.character_count == 0 {
            return Err(AnoError::EmptyRepresentation);
        }
        if self.suffix.trim().is_empty() {
            return Err(AnoError::BlankSuffix);
        }
        if !self.suffix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AnoError::InvalidSuffix(self.suffix.clone()));
        }
        if !table_name_pattern().is_match(&self.table_name) {
            return Err(AnoError::InvalidTableName(self.table_name.clone()));
        }
        Ok(())
    }

    /// Name of the column holding the real values: the table name without `ANO`
    pub fn identifiable_column_name(&self) -> &str {
        self.table_name
            .strip_prefix(ANO_PREFIX)
            .unwrap_or(&self.table_name)
    }

    /// Name of the column holding the anonymous values
    pub fn anonymous_column_name(&self) -> &str {
        &self.table_name
    }

    /// Length of every anonymous value
    pub fn anonymous_width(&self) -> usize {
        let ints = self.integer_count.max(0) as usize;
        let chars = self.character_count.max(0) as usize;
        ints + chars + 1 + self.suffix.len()
    }

    pub fn anonymous_data_type(&self) -> String {
        format!("varchar({})", self.anonymous_width())
    }

    /// Regex every anonymous value of this table matches
    ///
    /// `character_count` positions are upper case letters `A-Z` following the digits, so a
    /// value is `integer_count` digits, then `character_count` letters, then `_` and the suffix.
    pub fn shape_regex(&self) -> Result<Regex> {
        let pattern = format!(
            r"^\d{{{}}}[A-Z]{{{}}}_{}$",
            self.integer_count.max(0),
            self.character_count.max(0),
            regex::escape(&self.suffix)
        );
        Regex::new(&pattern)
            .map_err(|e| RdmpError::Validation(format!("Invalid anonymous value pattern: {e}")))
    }

    pub fn is_anonymous_value(&self, value: &str) -> bool {
        self.shape_regex()
            .map(|re| re.is_match(value))
            .unwrap_or(false)
    }

    /// DDL for the mapping table
    ///
    /// The identifiable column is the primary key and the anonymous column carries a unique
    /// constraint, so neither a real nor an anonymous value can ever be mapped twice.
    pub fn create_table_sql(&self, identifiable_type: &str) -> std::result::Result<String, AnoError> {
        self.validate()?;
        validate_identifiable_type(identifiable_type)?;

        let table = &self.table_name;
        let identifiable = self.identifiable_column_name();
        let anonymous = self.anonymous_column_name();

        Ok(format!(
            "CREATE TABLE \"{table}\" (\n\
             \x20   \"{identifiable}\" {identifiable_type} NOT NULL,\n\
             \x20   \"{anonymous}\" {} NOT NULL,\n\
             \x20   CONSTRAINT \"PK_{table}\" PRIMARY KEY (\"{identifiable}\"),\n\
             \x20   CONSTRAINT \"AK_{table}\" UNIQUE (\"{anonymous}\")\n\
             )",
            self.anonymous_data_type()
        ))
    }
}

impl fmt::Display for AnoTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.table_name, self.id)
    }
}

/// Checks that `data_type` looks like a plain SQL type such as `varchar(10)` or `decimal(8,2)`
pub fn validate_identifiable_type(data_type: &str) -> std::result::Result<(), AnoError> {
    if identifiable_type_pattern().is_match(data_type.trim()) {
        Ok(())
    } else {
        Err(AnoError::InvalidIdentifiableType(data_type.to_string()))
    }
}
