//! ANO table registry
//!
//! Owns every configured [`AnoTable`] and the suffix index used to reject clashes. One
//! registry is built per metadata repository (or per configuration file) and passed to
//! whoever needs it.

use super::ano_table::AnoTable;
use crate::config::AnoTableDefinition;
use crate::domain::{AnoError, AnoTableId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct AnoTableRegistry {
    tables: BTreeMap<AnoTableId, AnoTable>,

    /// Lowercased suffix to owning table
    suffixes: HashMap<String, AnoTableId>,

    next_id: u32,
}

impl AnoTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from the `[[anonymisation.tables]]` definitions, in order
    pub fn from_definitions(definitions: &[AnoTableDefinition]) -> Result<Self, AnoError> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.create(
                &definition.name,
                definition.integer_count,
                definition.character_count,
                &definition.suffix,
            )?;
        }
        Ok(registry)
    }

    /// Validates and registers a new table, assigning it the next id
    pub fn create(
        &mut self,
        table_name: &str,
        integer_count: i32,
        character_count: i32,
        suffix: &str,
    ) -> Result<&AnoTable, AnoError> {
        let id = AnoTableId::new(self.next_id + 1);
        let table = AnoTable::new(id, table_name, integer_count, character_count, suffix);
        self.save(table)?;
        self.tables.get(&id).ok_or_else(|| AnoError::NotFound(id.to_string()))
    }

    /// Inserts or updates a table after re-validating it against every other table
    pub fn save(&mut self, table: AnoTable) -> Result<(), AnoError> {
        table.validate()?;

        let suffix_key = table.suffix.to_lowercase();
        if let Some(existing) = self.suffixes.get(&suffix_key) {
            if *existing != table.id {
                let owner = self
                    .tables
                    .get(existing)
                    .map(|t| t.table_name.clone())
                    .unwrap_or_else(|| existing.to_string());
                return Err(AnoError::DuplicateSuffix {
                    suffix: table.suffix.clone(),
                    existing: owner,
                });
            }
        }

        let name_taken = self
            .tables
            .values()
            .any(|t| t.id != table.id && t.table_name.eq_ignore_ascii_case(&table.table_name));
        if name_taken {
            return Err(AnoError::DuplicateTableName(table.table_name));
        }

        if let Some(previous) = self.tables.get(&table.id) {
            self.suffixes.remove(&previous.suffix.to_lowercase());
        }
        self.suffixes.insert(suffix_key, table.id);
        self.next_id = self.next_id.max(table.id.get());
        self.tables.insert(table.id, table);
        Ok(())
    }

    pub fn get(&self, id: AnoTableId) -> Option<&AnoTable> {
        self.tables.get(&id)
    }

    /// Case-insensitive lookup by table name
    pub fn get_by_name(&self, name: &str) -> Result<&AnoTable, AnoError> {
        self.tables
            .values()
            .find(|t| t.table_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| AnoError::NotFound(name.to_string()))
    }

    pub fn delete(&mut self, id: AnoTableId) -> Option<AnoTable> {
        let table = self.tables.remove(&id)?;
        self.suffixes.remove(&table.suffix.to_lowercase());
        Some(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &AnoTable> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
