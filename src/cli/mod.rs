//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for RDMP using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// RDMP - identifier anonymisation and extraction query building
#[derive(Parser, Debug)]
#[command(name = "rdmp")]
#[command(version, about, long_about = None)]
#[command(author = "RDMP Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "rdmp.toml", env = "RDMP_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RDMP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Substitute anonymous identifiers into a JSON row batch
    Transform(commands::transform::TransformArgs),

    /// Create an ANO table's mapping table on the ANO server
    Push(commands::push::PushArgs),

    /// Build the SQL for a TOML query description
    BuildSql(commands::build_sql::BuildSqlArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_transform() {
        let cli = Cli::parse_from([
            "rdmp",
            "transform",
            "--table",
            "ANOCHI",
            "--input",
            "batch.json",
            "--source",
            "CHI",
        ]);
        assert_eq!(cli.config, "rdmp.toml");
        match cli.command {
            Commands::Transform(args) => {
                assert_eq!(args.table, "ANOCHI");
                assert_eq!(args.source, "CHI");
                assert!(args.destination.is_none());
                assert!(!args.preview);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["rdmp", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["rdmp", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_push() {
        let cli = Cli::parse_from(["rdmp", "push", "--table", "ANOCHI", "--identifiable-type", "varchar(10)"]);
        match cli.command {
            Commands::Push(args) => assert_eq!(args.identifiable_type, "varchar(10)"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_build_sql() {
        let cli = Cli::parse_from(["rdmp", "build-sql", "--query", "query.toml", "--dialect", "postgresql"]);
        assert!(matches!(cli.command, Commands::BuildSql(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["rdmp", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
