//! Declared relationships between tables

use super::table_info::ColumnInfo;
use crate::domain::{LookupId, TableInfoId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The JOIN keyword used when the foreign key table is on the left of the join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionJoinType {
    #[default]
    Left,
    Right,
    Inner,
}

impl ExtractionJoinType {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Inner => "INNER",
        }
    }

    /// The join type to use when the primary key table is written on the left instead
    pub fn inverse(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Inner => Self::Inner,
        }
    }
}

impl fmt::Display for ExtractionJoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// `fk = pk [COLLATE c]`, with each side already rendered
pub(crate) fn equality_sql(fk: &str, pk: &str, collation: Option<&str>) -> String {
    match collation {
        Some(collation) => format!("{fk} = {pk} COLLATE {collation}"),
        None => format!("{fk} = {pk}"),
    }
}

/// A directed relationship from a foreign key column to a primary key column
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    pub foreign_key: ColumnInfo,
    pub primary_key: ColumnInfo,
    pub join_type: ExtractionJoinType,
    pub collation: Option<String>,

    /// Additional SQL ANDed into the ON clause
    pub extra_on_sql: Option<String>,
}

impl JoinInfo {
    pub fn new(foreign_key: ColumnInfo, primary_key: ColumnInfo, join_type: ExtractionJoinType) -> Self {
        Self {
            foreign_key,
            primary_key,
            join_type,
            collation: None,
            extra_on_sql: None,
        }
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn with_extra_on_sql(mut self, sql: impl Into<String>) -> Self {
        self.extra_on_sql = Some(sql.into());
        self
    }

    pub fn foreign_key_table(&self) -> TableInfoId {
        self.foreign_key.table_id()
    }

    pub fn primary_key_table(&self) -> TableInfoId {
        self.primary_key.table_id()
    }

    /// True if this join connects `a` and `b`, in either direction
    pub fn connects(&self, a: TableInfoId, b: TableInfoId) -> bool {
        let (fk, pk) = (self.foreign_key_table(), self.primary_key_table());
        (fk == a && pk == b) || (fk == b && pk == a)
    }

    /// The ON clause fragment for this join (without the `ON` keyword)
    pub fn on_sql(&self) -> String {
        let equality = equality_sql(
            &self.foreign_key.fully_qualified_name(),
            &self.primary_key.fully_qualified_name(),
            self.collation.as_deref(),
        );
        match &self.extra_on_sql {
            Some(extra) if !extra.trim().is_empty() => format!("{equality} AND {}", extra.trim()),
            _ => equality,
        }
    }
}

impl fmt::Display for JoinInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} JOIN {}",
            self.foreign_key, self.join_type, self.primary_key
        )
    }
}

/// A join whose purpose is to fetch a human readable description for a coded value
///
/// The description and primary key columns live on the lookup table; the foreign key lives on
/// the dataset table that holds the code.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub id: LookupId,
    pub description: ColumnInfo,
    pub foreign_key: ColumnInfo,
    pub primary_key: ColumnInfo,
    pub join_type: ExtractionJoinType,
    pub collation: Option<String>,

    /// Extra (foreign key, primary key) pairs for lookups with composite keys
    pub composite_keys: Vec<(ColumnInfo, ColumnInfo)>,
}

impl Lookup {
    pub fn new(
        id: LookupId,
        description: ColumnInfo,
        foreign_key: ColumnInfo,
        primary_key: ColumnInfo,
    ) -> Self {
        Self {
            id,
            description,
            foreign_key,
            primary_key,
            join_type: ExtractionJoinType::Left,
            collation: None,
            composite_keys: Vec::new(),
        }
    }

    pub fn with_join_type(mut self, join_type: ExtractionJoinType) -> Self {
        self.join_type = join_type;
        self
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn with_composite_key(mut self, foreign_key: ColumnInfo, primary_key: ColumnInfo) -> Self {
        self.composite_keys.push((foreign_key, primary_key));
        self
    }

    pub fn lookup_table(&self) -> TableInfoId {
        self.primary_key.table_id()
    }

    /// The lookup as plain joins on the real lookup table, one per key pair
    ///
    /// Used when a query selects other columns of the lookup table and nothing else joins it.
    pub fn as_join_infos(&self) -> Vec<JoinInfo> {
        std::iter::once((&self.foreign_key, &self.primary_key))
            .chain(self.composite_keys.iter().map(|(fk, pk)| (fk, pk)))
            .map(|(fk, pk)| {
                let join = JoinInfo::new(fk.clone(), pk.clone(), self.join_type);
                match &self.collation {
                    Some(collation) => join.with_collation(collation.clone()),
                    None => join,
                }
            })
            .collect()
    }

    /// ON clause fragment joining the lookup table under `alias`
    pub fn on_sql(&self, alias: &str) -> String {
        let collation = self.collation.as_deref();
        std::iter::once((&self.foreign_key, &self.primary_key))
            .chain(self.composite_keys.iter().map(|(fk, pk)| (fk, pk)))
            .map(|(fk, pk)| equality_sql(&fk.fully_qualified_name(), &pk.aliased_name(alias), collation))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}
