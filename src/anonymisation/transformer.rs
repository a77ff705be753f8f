//! Identifier substitution over row batches

use super::ano_table::AnoTable;
use super::audit::AuditLogger;
use super::batch::RowBatch;
use super::generator::AnonymousValueGenerator;
use super::report::TransformSummary;
use crate::adapters::{AnoMappingStore, InsertOutcome};
use crate::domain::{AnoError, RdmpError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Default number of fresh values tried when a generated one is already taken
pub const DEFAULT_MAX_COLLISION_RETRIES: usize = 10;

/// Replaces the values of one column with their permanent anonymous substitutes
///
/// In committed mode every distinct real value is looked up in the mapping store and values
/// without a mapping get a new one, so the same real value always produces the same anonymous
/// value. Preview mode generates throwaway values and never touches the store.
pub struct AnoTransformer {
    table: AnoTable,
    store: Option<Arc<dyn AnoMappingStore>>,
    generator: AnonymousValueGenerator,
    max_collision_retries: usize,
    audit: Option<AuditLogger>,
}

impl AnoTransformer {
    pub fn new(table: AnoTable, store: Arc<dyn AnoMappingStore>) -> Self {
        Self {
            table,
            store: Some(store),
            generator: AnonymousValueGenerator::new(),
            max_collision_retries: DEFAULT_MAX_COLLISION_RETRIES,
            audit: None,
        }
    }

    /// A transformer without a store; only preview transforms succeed
    pub fn preview_only(table: AnoTable) -> Self {
        Self {
            table,
            store: None,
            generator: AnonymousValueGenerator::new(),
            max_collision_retries: DEFAULT_MAX_COLLISION_RETRIES,
            audit: None,
        }
    }

    pub fn with_generator(mut self, generator: AnonymousValueGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_max_collision_retries(mut self, retries: usize) -> Self {
        self.max_collision_retries = retries.max(1);
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn table(&self) -> &AnoTable {
        &self.table
    }

    /// Fills `destination` with the anonymous substitute of each `source` value
    ///
    /// The destination column is created if missing. Null sources stay null. Nothing in the
    /// batch changes unless every distinct value was resolved.
    ///
    /// # Errors
    ///
    /// Fails if the table configuration is invalid, `source` is not in the batch, a committed
    /// transform has no store or the store fails, or no free anonymous value was found within
    /// the retry budget.
    pub async fn transform(
        &mut self,
        batch: &mut RowBatch,
        source: &str,
        destination: &str,
        preview_only: bool,
    ) -> Result<TransformSummary> {
        let started = Instant::now();

        self.table.validate()?;
        batch.validate()?;
        let source_index = batch.column_index(source)?;

        let distinct = distinct_values(batch, source_index);

        let (mappings, reused, newly_assigned) = if preview_only {
            let mappings = self.preview_mappings(&distinct)?;
            let assigned = mappings.len();
            (mappings, 0, assigned)
        } else {
            self.committed_mappings(&distinct).await?
        };

        let destination_index = batch.ensure_column(destination);
        for row in &mut batch.rows {
            let substitute = row[source_index]
                .as_ref()
                .and_then(|real| mappings.get(real).cloned());
            row[destination_index] = substitute;
        }

        let summary = TransformSummary {
            ano_table: self.table.table_name.clone(),
            source_column: source.to_string(),
            destination_column: destination.to_string(),
            rows: batch.len(),
            distinct_values: distinct.len(),
            reused,
            newly_assigned,
            preview: preview_only,
        };

        crate::log_transform_complete!(summary, started.elapsed());
        if let Some(audit) = &self.audit {
            audit.log_transform(&summary)?;
        }

        Ok(summary)
    }

    /// Fresh values, unique within this call
    fn preview_mappings(&mut self, distinct: &[String]) -> Result<HashMap<String, String>> {
        let mut used = HashSet::new();
        let mut mappings = HashMap::with_capacity(distinct.len());

        for real in distinct {
            let mut attempt = 0;
            let anonymous = loop {
                attempt += 1;
                let candidate = self.generator.generate(&self.table);
                if used.insert(candidate.clone()) {
                    break candidate;
                }
                if attempt >= self.max_collision_retries {
                    return Err(self.retries_exhausted());
                }
                crate::log_retry_attempt!(attempt, self.max_collision_retries, "anonymous value already used in preview");
            };
            mappings.insert(real.clone(), anonymous);
        }

        Ok(mappings)
    }

    /// Existing mappings plus new ones recorded in the store; returns (mappings, reused, new)
    async fn committed_mappings(
        &mut self,
        distinct: &[String],
    ) -> Result<(HashMap<String, String>, usize, usize)> {
        let store = self.store.clone().ok_or_else(|| {
            RdmpError::Configuration(format!(
                "A mapping store is required to commit substitutions for {}",
                self.table.table_name
            ))
        })?;

        let mut mappings = store.lookup(&self.table, distinct).await?;
        let mut reused = mappings.len();
        let mut newly_assigned = 0;

        for real in distinct {
            if mappings.contains_key(real) {
                continue;
            }

            let mut resolved = None;
            for attempt in 1..=self.max_collision_retries {
                let candidate = self.generator.generate(&self.table);
                match store.insert(&self.table, real, &candidate).await? {
                    InsertOutcome::Inserted => {
                        newly_assigned += 1;
                        resolved = Some(candidate);
                        break;
                    }
                    InsertOutcome::RealValueAlreadyMapped(existing) => {
                        tracing::debug!(
                            ano_table = %self.table.table_name,
                            "Real value was mapped by a concurrent writer, adopting its substitute"
                        );
                        reused += 1;
                        resolved = Some(existing);
                        break;
                    }
                    InsertOutcome::AnonymousValueTaken => {
                        crate::log_retry_attempt!(
                            attempt,
                            self.max_collision_retries,
                            "anonymous value already taken"
                        );
                    }
                }
            }

            match resolved {
                Some(anonymous) => {
                    mappings.insert(real.clone(), anonymous);
                }
                None => return Err(self.retries_exhausted()),
            }
        }

        Ok((mappings, reused, newly_assigned))
    }

    fn retries_exhausted(&self) -> RdmpError {
        AnoError::CollisionRetriesExhausted {
            table: self.table.table_name.clone(),
            attempts: self.max_collision_retries,
        }
        .into()
    }
}

/// Distinct non-null values of one column, in order of first appearance
fn distinct_values(batch: &RowBatch, column: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    batch
        .rows
        .iter()
        .filter_map(|row| row[column].as_ref())
        .filter(|value| seen.insert(value.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryAnoStore;
    use crate::domain::AnoTableId;

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn batch() -> RowBatch {
        let mut batch = RowBatch::new(["CHI", "Result"]);
        batch.push_row(vec![cell("0101010101"), cell("5.2")]).unwrap();
        batch.push_row(vec![None, cell("4.8")]).unwrap();
        batch.push_row(vec![cell("0202020202"), cell("3.3")]).unwrap();
        batch.push_row(vec![cell("0101010101"), cell("6.1")]).unwrap();
        batch
    }

    #[test]
    fn test_distinct_values_in_first_seen_order() {
        assert_eq!(
            distinct_values(&batch(), 0),
            vec!["0101010101".to_string(), "0202020202".to_string()]
        );
    }

    #[tokio::test]
    async fn test_preview_never_needs_a_store() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        let mut transformer = AnoTransformer::preview_only(table.clone());
        let mut batch = batch();

        let summary = transformer
            .transform(&mut batch, "CHI", "ANOCHI", true)
            .await
            .unwrap();

        assert!(summary.preview);
        assert_eq!(summary.distinct_values, 2);
        assert_eq!(batch.rows[0][2], batch.rows[3][2]);
        assert_ne!(batch.rows[0][2], batch.rows[2][2]);
        assert_eq!(batch.rows[1][2], None);
        assert!(table.is_anonymous_value(batch.rows[0][2].as_deref().unwrap()));
    }

    #[tokio::test]
    async fn test_committed_without_store_fails_untouched() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        let mut transformer = AnoTransformer::preview_only(table);
        let mut batch = batch();
        let before = batch.clone();

        let err = transformer
            .transform(&mut batch, "CHI", "ANOCHI", false)
            .await
            .unwrap_err();
        assert!(matches!(err, RdmpError::Configuration(_)));
        assert_eq!(batch, before);
    }

    #[tokio::test]
    async fn test_preview_runs_out_of_values() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOX", 1, 0, "A");
        let mut transformer = AnoTransformer::preview_only(table).with_max_collision_retries(200);

        let mut batch = RowBatch::new(["v"]);
        for i in 0..11 {
            batch.push_row(vec![Some(i.to_string())]).unwrap();
        }

        let err = transformer.transform(&mut batch, "v", "ano", true).await.unwrap_err();
        assert!(matches!(
            err,
            RdmpError::Anonymisation(AnoError::CollisionRetriesExhausted { .. })
        ));
        assert_eq!(batch.columns.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_previews_give_different_values() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        let mut transformer = AnoTransformer::preview_only(table.clone())
            .with_generator(AnonymousValueGenerator::seeded(3));

        let mut values = Vec::new();
        for _ in 0..3 {
            let mut batch = RowBatch::new(["CHI"]);
            batch.push_row(vec![cell("0101010101")]).unwrap();
            transformer.transform(&mut batch, "CHI", "ANOCHI", true).await.unwrap();
            values.push(batch.rows[0][1].clone().unwrap());
        }

        assert!(values.iter().all(|v| table.is_anonymous_value(v)));
        assert_ne!(values[0], values[1]);
        assert_ne!(values[0], values[2]);
        assert_ne!(values[1], values[2]);
    }

    /// A store where the first `taken` values of `seeded(seed)` already belong to other real values
    async fn store_with_taken_values(
        table: &AnoTable,
        seed: u64,
        taken: usize,
    ) -> (Arc<MemoryAnoStore>, Vec<String>) {
        let store = Arc::new(MemoryAnoStore::new());
        store.create_table(table, "varchar(10)").await.unwrap();

        let mut generator = AnonymousValueGenerator::seeded(seed);
        let upcoming: Vec<String> = (0..=taken).map(|_| generator.generate(table)).collect();
        for (i, anonymous) in upcoming[..taken].iter().enumerate() {
            let outcome = store.insert(table, &format!("other{i}"), anonymous).await.unwrap();
            assert_eq!(outcome, InsertOutcome::Inserted);
        }
        (store, upcoming)
    }

    #[tokio::test]
    async fn test_committed_retries_past_taken_values() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        let (store, upcoming) = store_with_taken_values(&table, 11, 2).await;

        let mut transformer = AnoTransformer::new(table.clone(), store.clone())
            .with_generator(AnonymousValueGenerator::seeded(11))
            .with_max_collision_retries(3);
        let mut batch = RowBatch::new(["CHI"]);
        batch.push_row(vec![cell("0101010101")]).unwrap();

        let summary = transformer
            .transform(&mut batch, "CHI", "ANOCHI", false)
            .await
            .unwrap();

        assert_eq!(summary.newly_assigned, 1);
        assert_eq!(batch.rows[0][1].as_deref(), Some(upcoming[2].as_str()));
        assert_eq!(store.mapping_count(&table), 3);
    }

    #[tokio::test]
    async fn test_committed_retries_exhausted_leaves_batch_untouched() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        let (store, _) = store_with_taken_values(&table, 11, 3).await;

        let mut transformer = AnoTransformer::new(table.clone(), store.clone())
            .with_generator(AnonymousValueGenerator::seeded(11))
            .with_max_collision_retries(3);
        let mut batch = RowBatch::new(["CHI"]);
        batch.push_row(vec![cell("0101010101")]).unwrap();
        let before = batch.clone();

        let err = transformer
            .transform(&mut batch, "CHI", "ANOCHI", false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RdmpError::Anonymisation(AnoError::CollisionRetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(batch, before);
        assert_eq!(store.mapping_count(&table), 3);
    }

    #[tokio::test]
    async fn test_missing_source_column() {
        let table = AnoTable::new(AnoTableId::new(1), "ANOCHI", 10, 0, "A");
        let store = Arc::new(MemoryAnoStore::new());
        let mut transformer = AnoTransformer::new(table, store);

        let err = transformer
            .transform(&mut batch(), "NHS", "ANONHS", false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Column 'NHS' was not found"));
    }
}
