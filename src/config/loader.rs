//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{PostgreSQLConfig, RdmpConfig};
use super::secret::secret_string;
use crate::domain::{RdmpError, Result};
use crate::query::SqlDialect;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// 1. Reads the TOML file
/// 2. Substitutes `${VAR}` references from the environment
/// 3. Parses the TOML into [`RdmpConfig`]
/// 4. Applies `RDMP_*` environment overrides
/// 5. Validates the result
///
/// # Errors
///
/// Returns [`RdmpError::Configuration`] if any step fails.
///
/// # Examples
///
/// ```no_run
/// use rdmp::config::load_config;
///
/// let config = load_config("rdmp.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<RdmpConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(RdmpError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RdmpError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Same as [`load_config`] for TOML already in memory
pub fn parse_config(contents: &str) -> Result<RdmpConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: RdmpConfig = toml::from_str(&contents)
        .map_err(|e| RdmpError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        RdmpError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables written as `${VAR_NAME}`; comment lines are left alone
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut missing_vars: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            re.replace_all(line, |caps: &regex::Captures<'_>| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                })
            })
            .into_owned()
        })
        .collect();

    if !missing_vars.is_empty() {
        return Err(RdmpError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies `RDMP_<SECTION>_<KEY>` environment overrides
fn apply_env_overrides(config: &mut RdmpConfig) -> Result<()> {
    if let Ok(val) = std::env::var("RDMP_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // A connection string alone is enough to configure the store
    if let Ok(val) = std::env::var("RDMP_ANO_STORE_CONNECTION_STRING") {
        match config.ano_store {
            Some(ref mut store) => store.connection_string = secret_string(val),
            None => {
                config.ano_store = Some(PostgreSQLConfig::with_connection_string(secret_string(val)))
            }
        }
    }
    if let Some(ref mut store) = config.ano_store {
        if let Ok(val) = std::env::var("RDMP_ANO_STORE_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                store.max_connections = max;
            }
        }
        if let Ok(val) = std::env::var("RDMP_ANO_STORE_STATEMENT_TIMEOUT_SECONDS") {
            if let Ok(timeout) = val.parse() {
                store.statement_timeout_seconds = timeout;
            }
        }
    }

    if let Ok(val) = std::env::var("RDMP_ANONYMISATION_MAX_COLLISION_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.anonymisation.max_collision_retries = retries;
        }
    }
    if let Ok(val) = std::env::var("RDMP_ANONYMISATION_AUDIT_ENABLED") {
        config.anonymisation.audit.enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("RDMP_ANONYMISATION_AUDIT_LOG_PATH") {
        config.anonymisation.audit.log_path = val;
    }

    if let Ok(val) = std::env::var("RDMP_QUERY_BUILDER_DIALECT") {
        config.query_builder.dialect = match val.to_lowercase().as_str() {
            "sqlserver" => SqlDialect::SqlServer,
            "postgresql" => SqlDialect::PostgreSql,
            other => {
                return Err(RdmpError::Configuration(format!(
                    "RDMP_QUERY_BUILDER_DIALECT must be sqlserver or postgresql, got '{other}'"
                )))
            }
        };
    }

    if let Ok(val) = std::env::var("RDMP_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("RDMP_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
