//! Integration tests for identifier substitution against the in-memory ANO store

use rdmp::adapters::{AnoMappingStore, MappingColumn, MappingTableSchema, MemoryAnoStore};
use rdmp::anonymisation::{
    push_to_ano_server_as_new_table, AnoTable, AnoTableRegistry, AnoTransformer, AuditLogger,
    RowBatch,
};
use rdmp::checks::{CheckResult, ThrowImmediatelyCheckNotifier, ToMemoryCheckNotifier};
use rdmp::domain::{AnoError, RdmpError};
use std::sync::Arc;
use tempfile::TempDir;

fn ano_chi() -> AnoTable {
    let mut registry = AnoTableRegistry::new();
    registry.create("ANOCHI", 9, 1, "A").unwrap().clone()
}

fn chi_batch(values: &[Option<&str>]) -> RowBatch {
    let mut batch = RowBatch::new(["CHI", "TestCode"]);
    for value in values {
        batch
            .push_row(vec![value.map(str::to_string), Some("HBA1C".to_string())])
            .unwrap();
    }
    batch
}

async fn pushed_store(table: &AnoTable) -> Arc<MemoryAnoStore> {
    let store = Arc::new(MemoryAnoStore::new());
    push_to_ano_server_as_new_table(
        table,
        store.as_ref(),
        "varchar(10)",
        &ThrowImmediatelyCheckNotifier::new(),
    )
    .await
    .unwrap();
    store
}

#[tokio::test]
async fn test_substitutions_are_permanent_across_runs() {
    let table = ano_chi();
    let store = pushed_store(&table).await;

    let mut first = chi_batch(&[Some("0101010101"), Some("0202020202"), None]);
    let mut transformer = AnoTransformer::new(table.clone(), store.clone());
    let summary = transformer
        .transform(&mut first, "CHI", "ANOCHI", false)
        .await
        .unwrap();
    assert_eq!(summary.distinct_values, 2);
    assert_eq!(summary.newly_assigned, 2);
    assert_eq!(summary.reused, 0);

    let mut second = chi_batch(&[Some("0202020202"), Some("0101010101"), Some("0303030303")]);
    let mut transformer = AnoTransformer::new(table.clone(), store.clone());
    let summary = transformer
        .transform(&mut second, "CHI", "ANOCHI", false)
        .await
        .unwrap();
    assert_eq!(summary.reused, 2);
    assert_eq!(summary.newly_assigned, 1);

    assert_eq!(first.rows[0][2], second.rows[1][2]);
    assert_eq!(first.rows[1][2], second.rows[0][2]);
    assert_eq!(first.rows[2][2], None);
    assert_eq!(store.mapping_count(&table), 3);

    for row in &second.rows {
        let value = row[2].as_deref().unwrap();
        assert!(table.is_anonymous_value(value), "{value} does not match the ANO shape");
    }
}

#[tokio::test]
async fn test_in_place_substitution() {
    let table = ano_chi();
    let store = pushed_store(&table).await;
    let mut batch = chi_batch(&[Some("0101010101")]);

    AnoTransformer::new(table.clone(), store)
        .transform(&mut batch, "chi", "CHI", false)
        .await
        .unwrap();

    assert_eq!(batch.columns.len(), 2);
    assert!(table.is_anonymous_value(batch.rows[0][0].as_deref().unwrap()));
}

#[tokio::test]
async fn test_unpushed_table_leaves_batch_untouched() {
    let table = ano_chi();
    let store = Arc::new(MemoryAnoStore::new());
    let mut batch = chi_batch(&[Some("0101010101")]);
    let before = batch.clone();

    let err = AnoTransformer::new(table, store)
        .transform(&mut batch, "CHI", "ANOCHI", false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RdmpError::Anonymisation(AnoError::TableNotPushed(_))
    ));
    assert_eq!(batch, before);
}

#[tokio::test]
async fn test_over_length_values_are_never_merged() {
    let table = ano_chi();
    let store = pushed_store(&table).await;
    let mut batch = chi_batch(&[Some("0101010101"), Some("01010101011"), Some("01010101012")]);
    let before = batch.clone();

    let err = AnoTransformer::new(table.clone(), store.clone())
        .transform(&mut batch, "CHI", "ANOCHI", false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RdmpError::Anonymisation(AnoError::RealValueTooLong { length: 11, max: 10, .. })
    ));
    assert_eq!(batch, before);
    assert_eq!(store.mapping_count(&table), 0);
}

#[tokio::test]
async fn test_preview_does_not_write_mappings() {
    let table = ano_chi();
    let store = pushed_store(&table).await;
    let mut batch = chi_batch(&[Some("0101010101"), Some("0101010101")]);

    let summary = AnoTransformer::new(table.clone(), store.clone())
        .transform(&mut batch, "CHI", "ANOCHI", true)
        .await
        .unwrap();

    assert!(summary.preview);
    assert_eq!(batch.rows[0][2], batch.rows[1][2]);
    assert_eq!(store.mapping_count(&table), 0);
}

#[tokio::test]
async fn test_concurrent_transforms_agree() {
    let table = ano_chi();
    let store = pushed_store(&table).await;
    let values: Vec<String> = (0..50).map(|i| format!("{:010}", i)).collect();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let table = table.clone();
        let values = values.clone();
        handles.push(tokio::spawn(async move {
            let mut batch = RowBatch::new(["CHI"]);
            for value in &values {
                batch.push_row(vec![Some(value.clone())]).unwrap();
            }
            AnoTransformer::new(table, store)
                .transform(&mut batch, "CHI", "ANOCHI", false)
                .await
                .unwrap();
            batch
        }));
    }

    let mut batches = Vec::new();
    for handle in handles {
        batches.push(handle.await.unwrap());
    }

    for batch in &batches[1..] {
        assert_eq!(batch, &batches[0]);
    }
    assert_eq!(store.mapping_count(&table), values.len());
}

#[tokio::test]
async fn test_push_is_idempotent() {
    let table = ano_chi();
    let store = pushed_store(&table).await;

    let notifier = ToMemoryCheckNotifier::new();
    push_to_ano_server_as_new_table(&table, store.as_ref(), "varchar(10)", &notifier)
        .await
        .unwrap();

    assert_eq!(notifier.worst(), CheckResult::Success);
    assert!(notifier.messages(CheckResult::Success)[0].contains("already exists"));
    assert!(store.describe_table(&table).await.unwrap().is_some());
}

#[tokio::test]
async fn test_push_reports_mismatched_table() {
    let table = ano_chi();
    let store = MemoryAnoStore::new().with_existing_table(MappingTableSchema {
        table_name: "ANOCHI".to_string(),
        columns: vec![
            MappingColumn::new("CHI", "varchar(12)"),
            MappingColumn::new("ANOCHI", "varchar(12)"),
        ],
    });

    let notifier = ToMemoryCheckNotifier::new();
    push_to_ano_server_as_new_table(&table, &store, "varchar(10)", &notifier)
        .await
        .unwrap();

    let failures = notifier.messages(CheckResult::Fail);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("column CHI is varchar(12) but should be varchar(10)"));

    let strict = push_to_ano_server_as_new_table(
        &table,
        &store,
        "varchar(10)",
        &ThrowImmediatelyCheckNotifier::new(),
    )
    .await;
    assert!(matches!(strict, Err(RdmpError::Check(_))));
}

#[tokio::test]
async fn test_push_rejects_bad_identifiable_type() {
    let table = ano_chi();
    let store = MemoryAnoStore::new();
    let notifier = ToMemoryCheckNotifier::new();

    push_to_ano_server_as_new_table(&table, &store, "varchar(10); DROP TABLE x", &notifier)
        .await
        .unwrap();

    assert_eq!(notifier.worst(), CheckResult::Fail);
    assert!(store.describe_table(&table).await.unwrap().is_none());
}

#[tokio::test]
async fn test_audit_log_records_counts_only() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("audit").join("ano.log");
    let table = ano_chi();
    let store = pushed_store(&table).await;

    let mut batch = chi_batch(&[Some("0101010101")]);
    AnoTransformer::new(table, store)
        .with_audit(AuditLogger::new(log_path.clone(), true, true).unwrap())
        .transform(&mut batch, "CHI", "ANOCHI", false)
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let entry: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(entry["ano_table"], "ANOCHI");
    assert_eq!(entry["newly_assigned"], 1);
    assert!(!contents.contains("0101010101"));
}
