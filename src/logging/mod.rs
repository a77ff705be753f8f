//! Logging and observability
//!
//! Structured logging through `tracing`, plus a few macros that keep the fields of recurring
//! events consistent across the crate.
//!
//! ```no_run
//! use rdmp::logging::init_logging;
//! use rdmp::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of a transform call
///
/// ```no_run
/// use rdmp::log_transform_complete;
/// use rdmp::anonymisation::TransformSummary;
///
/// # fn example(summary: &TransformSummary) {
/// log_transform_complete!(summary, std::time::Duration::from_millis(12));
/// # }
/// ```
#[macro_export]
macro_rules! log_transform_complete {
    ($summary:expr, $duration:expr) => {
        tracing::info!(
            ano_table = %$summary.ano_table,
            source = %$summary.source_column,
            destination = %$summary.destination_column,
            rows = $summary.rows,
            distinct_values = $summary.distinct_values,
            reused = $summary.reused,
            newly_assigned = $summary.newly_assigned,
            preview = $summary.preview,
            duration_ms = $duration.as_millis() as u64,
            "Transform completed"
        );
    };
}

/// Log a retry attempt
///
/// ```no_run
/// use rdmp::log_retry_attempt;
///
/// log_retry_attempt!(2, 10, "anonymous value already taken");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::debug!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = $reason,
            "Retrying operation"
        );
    };
}

/// Log a freshly built query
#[macro_export]
macro_rules! log_query_built {
    ($tables:expr, $joins:expr, $lookups:expr, $sql_len:expr) => {
        tracing::debug!(
            tables = $tables,
            joins = $joins,
            lookups = $lookups,
            sql_len = $sql_len,
            "Query built"
        );
    };
}

/// Log an error with context
///
/// ```no_run
/// use rdmp::log_error_with_context;
/// use rdmp::domain::RdmpError;
///
/// let error = RdmpError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
