//! Build-sql command implementation

use crate::checks::{CheckResult, ToMemoryCheckNotifier};
use crate::query::{QueryDocument, SqlDialect};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the build-sql command
#[derive(Args, Debug)]
pub struct BuildSqlArgs {
    /// TOML query description
    #[arg(short, long)]
    pub query: PathBuf,

    /// Override the dialect in the query file (sqlserver or postgresql)
    #[arg(long)]
    pub dialect: Option<String>,

    /// Run the query checks and report warnings before printing the SQL
    #[arg(long)]
    pub check: bool,
}

impl BuildSqlArgs {
    /// Execute the build-sql command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(query = %self.query.display(), "Building query SQL");

        let dialect = match self.dialect.as_deref().map(parse_dialect).transpose() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        let mut builder = match QueryDocument::load(&self.query).and_then(QueryDocument::into_builder) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Invalid query file: {e}");
                return Ok(2);
            }
        };

        if let Some(dialect) = dialect {
            builder.set_dialect(dialect);
        }

        if self.check {
            let notifier = ToMemoryCheckNotifier::new();
            builder.check(&notifier)?;
            for message in notifier.messages(CheckResult::Warning) {
                eprintln!("⚠️  {message}");
            }
            let failures = notifier.messages(CheckResult::Fail);
            if !failures.is_empty() {
                for message in failures {
                    eprintln!("❌ {message}");
                }
                return Ok(3);
            }
        }

        match builder.sql() {
            Ok(sql) => {
                println!("{sql}");
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Query building failed");
                eprintln!("Query building failed: {e}");
                Ok(3)
            }
        }
    }
}

fn parse_dialect(value: &str) -> Result<SqlDialect, String> {
    match value.to_ascii_lowercase().as_str() {
        "sqlserver" | "mssql" => Ok(SqlDialect::SqlServer),
        "postgresql" | "postgres" => Ok(SqlDialect::PostgreSql),
        other => Err(format!("Unknown dialect '{other}'. Use 'sqlserver' or 'postgresql'")),
    }
}
