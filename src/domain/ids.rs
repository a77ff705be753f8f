//! Catalogue identifier types
//!
//! Every persisted catalogue object (tables, columns, lookups, ANO tables) is identified by
//! the integer primary key the metadata repository assigned it. These newtypes stop one kind
//! of id being passed where another is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! catalogue_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates a new id from the repository primary key
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Returns the underlying primary key
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u32>()
                    .map(Self)
                    .map_err(|e| format!("Invalid {} '{}': {}", $label, s, e))
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }
    };
}

catalogue_id!(
    /// Identifies a `TableInfo` in the catalogue
    TableInfoId,
    "TableInfo"
);

catalogue_id!(
    /// Identifies a `ColumnInfo` in the catalogue
    ColumnInfoId,
    "ColumnInfo"
);

catalogue_id!(
    /// Identifies a `Lookup` declaration
    LookupId,
    "Lookup"
);

catalogue_id!(
    /// Identifies a configured ANO table
    AnoTableId,
    "ANOTable"
);
