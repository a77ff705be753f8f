//! Configuration management
//!
//! RDMP reads a single TOML file (`rdmp.toml` by default) with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `RDMP_<SECTION>_<KEY>` environment overrides
//! - Default values for every optional setting
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [ano_store]
//! connection_string = "${RDMP_ANO_STORE_URL}"
//! max_connections = 10
//!
//! [anonymisation]
//! max_collision_retries = 10
//!
//! [anonymisation.audit]
//! enabled = true
//! log_path = "audit/ano_transform.log"
//!
//! [[anonymisation.tables]]
//! name = "ANOCHI"
//! integer_count = 10
//! character_count = 0
//! suffix = "A"
//!
//! [query_builder]
//! dialect = "sqlserver"
//!
//! [logging]
//! local_enabled = true
//! local_path = "/var/log/rdmp"
//! local_rotation = "daily"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    AnoTableDefinition, AnonymisationConfig, ApplicationConfig, AuditConfig, LoggingConfig,
    PostgreSQLConfig, QueryBuilderConfig, RdmpConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
