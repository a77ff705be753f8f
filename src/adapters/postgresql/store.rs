//! PostgreSQL mapping store

use super::client::PostgreSQLClient;
use crate::adapters::store::{
    check_real_value_fits, AnoMappingStore, InsertOutcome, MappingColumn, MappingTableSchema,
};
use crate::anonymisation::AnoTable;
use crate::domain::{AnoError, RdmpError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_postgres::Row;

const DESCRIBE_SQL: &str = "SELECT column_name::text, data_type::text, \
     character_maximum_length::int, numeric_precision::int, numeric_scale::int \
     FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = $1 \
     ORDER BY ordinal_position";

/// Mapping tables stored as real tables on the ANO server
///
/// Real values travel as text and are cast to the identifiable column's type on the server,
/// so the same code serves `varchar` and numeric identifiers. Values longer than a
/// `varchar(n)` column are rejected before the cast can truncate them.
pub struct PostgreSqlAnoStore {
    client: Arc<PostgreSQLClient>,

    /// Identifiable column type per table, read once from the server
    identifiable_types: Mutex<HashMap<String, String>>,
}

impl PostgreSqlAnoStore {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
            identifiable_types: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    async fn identifiable_type(&self, table: &AnoTable) -> Result<String> {
        if let Some(cached) = self.cached_type(table)? {
            return Ok(cached);
        }

        let schema = self
            .describe_table(table)
            .await?
            .ok_or_else(|| AnoError::TableNotPushed(table.table_name.clone()))?;
        let column = schema
            .columns
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(table.identifiable_column_name()))
            .ok_or_else(|| {
                RdmpError::Database(format!(
                    "Table {} has no column {}",
                    table.table_name,
                    table.identifiable_column_name()
                ))
            })?;

        self.identifiable_types
            .lock()
            .map_err(|_| RdmpError::Database("identifiable type cache lock poisoned".to_string()))?
            .insert(table.table_name.clone(), column.data_type.clone());
        Ok(column.data_type)
    }

    fn cached_type(&self, table: &AnoTable) -> Result<Option<String>> {
        let cache = self
            .identifiable_types
            .lock()
            .map_err(|_| RdmpError::Database("identifiable type cache lock poisoned".to_string()))?;
        Ok(cache.get(&table.table_name).cloned())
    }
}

/// Renders an `information_schema.columns` row as a type name usable in a CAST
fn column_type(row: &Row) -> String {
    let data_type: String = row.get(1);
    let length: Option<i32> = row.get(2);
    let precision: Option<i32> = row.get(3);
    let scale: Option<i32> = row.get(4);

    match (data_type.as_str(), length, precision) {
        ("character varying", Some(length), _) => format!("varchar({length})"),
        ("character", Some(length), _) => format!("char({length})"),
        ("numeric", _, Some(precision)) => format!("decimal({},{})", precision, scale.unwrap_or(0)),
        _ => data_type,
    }
}

#[async_trait]
impl AnoMappingStore for PostgreSqlAnoStore {
    async fn describe_table(&self, table: &AnoTable) -> Result<Option<MappingTableSchema>> {
        let rows = self.client.query(DESCRIBE_SQL, &[&table.table_name]).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        Ok(Some(MappingTableSchema {
            table_name: table.table_name.clone(),
            columns: rows
                .iter()
                .map(|row| MappingColumn::new(row.get::<_, String>(0), column_type(row)))
                .collect(),
        }))
    }

    async fn create_table(&self, table: &AnoTable, identifiable_type: &str) -> Result<()> {
        let ddl = table.create_table_sql(identifiable_type)?;
        self.client.batch_execute(&ddl).await?;

        tracing::info!(table = %table.table_name, identifiable_type, "Created ANO mapping table");
        Ok(())
    }

    async fn lookup(
        &self,
        table: &AnoTable,
        real_values: &[String],
    ) -> Result<HashMap<String, String>> {
        let identifiable_type = self.identifiable_type(table).await?;
        if real_values.is_empty() {
            return Ok(HashMap::new());
        }
        for real_value in real_values {
            check_real_value_fits(table, &identifiable_type, real_value)?;
        }

        let sql = format!(
            "SELECT \"{real}\"::text, \"{anonymous}\" FROM \"{table}\" \
             WHERE \"{real}\" = ANY(CAST($1::text[] AS {identifiable_type}[]))",
            real = table.identifiable_column_name(),
            anonymous = table.anonymous_column_name(),
            table = table.table_name,
        );
        let rows = self.client.query(&sql, &[&real_values]).await?;

        Ok(rows
            .iter()
            .map(|row| (row.get::<_, String>(0), row.get::<_, String>(1)))
            .collect())
    }

    async fn insert(
        &self,
        table: &AnoTable,
        real_value: &str,
        anonymous_value: &str,
    ) -> Result<InsertOutcome> {
        let identifiable_type = self.identifiable_type(table).await?;
        check_real_value_fits(table, &identifiable_type, real_value)?;
        let real = table.identifiable_column_name();
        let anonymous = table.anonymous_column_name();
        let name = &table.table_name;

        let insert = format!(
            "INSERT INTO \"{name}\" (\"{real}\", \"{anonymous}\") \
             VALUES (CAST($1::text AS {identifiable_type}), $2) ON CONFLICT DO NOTHING"
        );
        if self.client.execute(&insert, &[&real_value, &anonymous_value]).await? == 1 {
            return Ok(InsertOutcome::Inserted);
        }

        let existing = format!(
            "SELECT \"{anonymous}\" FROM \"{name}\" WHERE \"{real}\" = CAST($1::text AS {identifiable_type})"
        );
        let rows = self.client.query(&existing, &[&real_value]).await?;
        Ok(match rows.first() {
            Some(row) => InsertOutcome::RealValueAlreadyMapped(row.get(0)),
            None => InsertOutcome::AnonymousValueTaken,
        })
    }

    fn store_name(&self) -> &str {
        "postgresql"
    }
}
