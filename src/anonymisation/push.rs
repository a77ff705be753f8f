//! Creating mapping tables on the ANO server

use super::ano_table::{validate_identifiable_type, AnoTable};
use crate::adapters::{AnoMappingStore, MappingTableSchema};
use crate::checks::{CheckEvent, CheckNotifier};
use crate::domain::Result;

/// Creates the mapping table for `table` unless it already exists
///
/// Pushing a table that already exists with the expected shape succeeds without changes. A
/// table that exists with a different shape is reported as a failure and left alone.
///
/// # Errors
///
/// Store errors are returned directly. Configuration problems and shape mismatches go through
/// `notifier`, so they become errors only for strict notifiers.
pub async fn push_to_ano_server_as_new_table(
    table: &AnoTable,
    store: &dyn AnoMappingStore,
    identifiable_type: &str,
    notifier: &dyn CheckNotifier,
) -> Result<()> {
    if let Err(e) = table
        .validate()
        .and_then(|_| validate_identifiable_type(identifiable_type))
    {
        return notifier.on_check_performed(CheckEvent::fail(e.to_string()));
    }

    let expected = MappingTableSchema::expected(table, identifiable_type);

    match store.describe_table(table).await? {
        Some(actual) => {
            let differences = expected.differences(&actual);
            if differences.is_empty() {
                notifier.on_check_performed(CheckEvent::success(format!(
                    "Table {} already exists on the ANO server with the expected columns",
                    table.table_name
                )))
            } else {
                notifier.on_check_performed(CheckEvent::fail(format!(
                    "Table {} already exists on the ANO server but does not match its ANOTable: {}",
                    table.table_name,
                    differences.join("; ")
                )))
            }
        }
        None => {
            store.create_table(table, identifiable_type).await?;
            tracing::info!(
                table = %table.table_name,
                store = store.store_name(),
                identifiable_type,
                "Pushed ANO table"
            );
            notifier.on_check_performed(CheckEvent::success(format!(
                "Created table {} on the ANO server ({} {}, {} {})",
                table.table_name,
                table.identifiable_column_name(),
                identifiable_type,
                table.anonymous_column_name(),
                table.anonymous_data_type()
            )))
        }
    }
}
