//! In-process mapping store
//!
//! Holds mapping tables in memory with the same guarantees as the database: one mapping per
//! real value and one real value per anonymous value. Used by tests and by callers that want
//! store semantics without a server.

use super::store::{check_real_value_fits, AnoMappingStore, InsertOutcome, MappingTableSchema};
use crate::anonymisation::AnoTable;
use crate::domain::{AnoError, RdmpError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug)]
struct MappingTable {
    schema: MappingTableSchema,
    by_real: HashMap<String, String>,
    by_anonymous: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct MemoryAnoStore {
    tables: Mutex<HashMap<String, MappingTable>>,
}

impl MemoryAnoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table with an arbitrary shape, for exercising mismatch handling
    pub fn with_existing_table(self, schema: MappingTableSchema) -> Self {
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(
                schema.table_name.to_lowercase(),
                MappingTable {
                    schema,
                    by_real: HashMap::new(),
                    by_anonymous: HashMap::new(),
                },
            );
        }
        self
    }

    /// Number of mappings held for `table`
    pub fn mapping_count(&self, table: &AnoTable) -> usize {
        self.tables
            .lock()
            .ok()
            .and_then(|tables| {
                tables
                    .get(&table.table_name.to_lowercase())
                    .map(|t| t.by_real.len())
            })
            .unwrap_or(0)
    }

    fn with_table<T>(
        &self,
        table: &AnoTable,
        f: impl FnOnce(&mut MappingTable) -> T,
    ) -> Result<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| RdmpError::Database("memory ANO store lock poisoned".to_string()))?;
        let mapping = tables
            .get_mut(&table.table_name.to_lowercase())
            .ok_or_else(|| AnoError::TableNotPushed(table.table_name.clone()))?;
        Ok(f(mapping))
    }

    fn check_fits<'a>(
        &self,
        table: &AnoTable,
        real_values: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let identifiable_type = self.with_table(table, |mapping| {
            mapping
                .schema
                .columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(table.identifiable_column_name()))
                .map(|c| c.data_type.clone())
        })?;

        match identifiable_type {
            Some(identifiable_type) => real_values
                .into_iter()
                .try_for_each(|real| check_real_value_fits(table, &identifiable_type, real)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AnoMappingStore for MemoryAnoStore {
    async fn describe_table(&self, table: &AnoTable) -> Result<Option<MappingTableSchema>> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| RdmpError::Database("memory ANO store lock poisoned".to_string()))?;
        Ok(tables
            .get(&table.table_name.to_lowercase())
            .map(|t| t.schema.clone()))
    }

    async fn create_table(&self, table: &AnoTable, identifiable_type: &str) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| RdmpError::Database("memory ANO store lock poisoned".to_string()))?;

        let key = table.table_name.to_lowercase();
        if tables.contains_key(&key) {
            return Err(RdmpError::Database(format!(
                "Table {} already exists",
                table.table_name
            )));
        }

        tables.insert(
            key,
            MappingTable {
                schema: MappingTableSchema::expected(table, identifiable_type),
                by_real: HashMap::new(),
                by_anonymous: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn lookup(
        &self,
        table: &AnoTable,
        real_values: &[String],
    ) -> Result<HashMap<String, String>> {
        self.check_fits(table, real_values.iter().map(String::as_str))?;
        self.with_table(table, |mapping| {
            real_values
                .iter()
                .filter_map(|real| {
                    mapping
                        .by_real
                        .get(real)
                        .map(|anonymous| (real.clone(), anonymous.clone()))
                })
                .collect()
        })
    }

    async fn insert(
        &self,
        table: &AnoTable,
        real_value: &str,
        anonymous_value: &str,
    ) -> Result<InsertOutcome> {
        self.check_fits(table, [real_value])?;
        self.with_table(table, |mapping| {
            if let Some(existing) = mapping.by_real.get(real_value) {
                return InsertOutcome::RealValueAlreadyMapped(existing.clone());
            }
            if mapping.by_anonymous.contains_key(anonymous_value) {
                return InsertOutcome::AnonymousValueTaken;
            }
            mapping
                .by_real
                .insert(real_value.to_string(), anonymous_value.to_string());
            mapping
                .by_anonymous
                .insert(anonymous_value.to_string(), real_value.to_string());
            InsertOutcome::Inserted
        })
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnoTableId;

    fn table() -> AnoTable {
        AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A")
    }

    #[tokio::test]
    async fn test_lookup_before_push_fails() {
        let store = MemoryAnoStore::new();
        let err = store.lookup(&table(), &["1".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("has not been pushed"));
    }

    #[tokio::test]
    async fn test_insert_enforces_both_uniques() {
        let store = MemoryAnoStore::new();
        let table = table();
        store.create_table(&table, "varchar(10)").await.unwrap();

        assert_eq!(
            store.insert(&table, "111", "0000000001_A").await.unwrap(),
            InsertOutcome::Inserted
        );
        assert_eq!(
            store.insert(&table, "222", "0000000001_A").await.unwrap(),
            InsertOutcome::AnonymousValueTaken
        );
        assert_eq!(
            store.insert(&table, "111", "0000000002_A").await.unwrap(),
            InsertOutcome::RealValueAlreadyMapped("0000000001_A".to_string())
        );

        let found = store
            .lookup(&table, &["111".to_string(), "222".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["111"], "0000000001_A");
        assert_eq!(store.mapping_count(&table), 1);
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let store = MemoryAnoStore::new();
        store.create_table(&table(), "varchar(10)").await.unwrap();
        assert!(store.create_table(&table(), "varchar(10)").await.is_err());
    }
}
