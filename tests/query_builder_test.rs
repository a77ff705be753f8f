//! Integration tests for building extraction SQL from query descriptions

use rdmp::checks::{CheckResult, ToMemoryCheckNotifier};
use rdmp::domain::QueryBuildingError;
use rdmp::query::{QueryDocument, SqlDialect};
use std::io::Write;
use tempfile::NamedTempFile;

const BIOCHEMISTRY: &str = r#"
[[tables]]
name = "Tests"
primary = true
columns = [
    { name = "chi", data_type = "varchar(10)" },
    { name = "code" },
    { name = "secondary_code" },
    { name = "lab_id", data_type = "int" },
    { name = "result", data_type = "decimal(8,2)" },
]

[[tables]]
name = "Labs"
columns = [{ name = "id", data_type = "int" }, { name = "name" }]

[[tables]]
name = "Codes"
columns = [{ name = "code" }, { name = "description" }]

[[joins]]
foreign_key = "Tests.lab_id"
primary_key = "Labs.id"

[[lookups]]
description = "Codes.description"
foreign_key = "Tests.code"
primary_key = "Codes.code"

[[lookups]]
description = "Codes.description"
foreign_key = "Tests.secondary_code"
primary_key = "Codes.code"
"#;

fn document(select: &str) -> QueryDocument {
    document_with_settings("", select)
}

/// Top level settings must precede the table arrays or TOML attaches them to the last entry
fn document_with_settings(settings: &str, select: &str) -> QueryDocument {
    QueryDocument::from_toml_str(&format!("{settings}\n{BIOCHEMISTRY}\n{select}")).unwrap()
}

#[test]
fn test_single_lookup_query() {
    let mut builder = document(
        r#"
[[select]]
column = "Tests.chi"
extraction_identifier = true

[[select]]
column = "Tests.code"
order = 1

[[select]]
column = "Codes.description"
order = 2
"#,
    )
    .into_builder()
    .unwrap();

    assert_eq!(
        builder.sql().unwrap(),
        "SELECT\nTests.chi,\nTests.code,\nlookup_1.description\nFROM\nTests\nLEFT JOIN Codes AS lookup_1 ON Tests.code = lookup_1.code"
    );
}

#[test]
fn test_join_and_lookup_together() {
    let mut builder = document(
        r#"
[[select]]
column = "Tests.chi"
extraction_identifier = true

[[select]]
column = "Labs.name"
alias = "Lab"
order = 1

[[select]]
column = "Tests.code"
order = 2

[[select]]
column = "Codes.description"
order = 3
"#,
    )
    .into_builder()
    .unwrap();

    let built = builder.build().unwrap();
    assert_eq!(built.anchor.name, "Tests");
    assert_eq!(built.joins.len(), 1);
    assert_eq!(built.lookup_aliases.len(), 1);

    let sql = &built.sql;
    assert!(sql.contains("Labs.name AS Lab"));
    assert!(sql.contains("LEFT JOIN Labs ON Tests.lab_id = Labs.id"));
    assert!(sql.contains("LEFT JOIN Codes AS lookup_1 ON Tests.code = lookup_1.code"));
    assert!(
        sql.find("JOIN Labs").unwrap() < sql.find("AS lookup_1").unwrap(),
        "table joins come before lookup joins"
    );
}

#[test]
fn test_lookup_table_columns_joined_through_the_lookup() {
    let mut builder = document(
        r#"
[[select]]
column = "Tests.chi"
extraction_identifier = true

[[select]]
column = "Tests.code"
order = 1

[[select]]
column = "Codes.code"
alias = "CodeKey"
order = 2
"#,
    )
    .into_builder()
    .unwrap();

    assert_eq!(
        builder.sql().unwrap(),
        "SELECT\nTests.chi,\nTests.code,\nCodes.code AS CodeKey\nFROM\nTests\nLEFT JOIN Codes ON Tests.code = Codes.code"
    );
}

#[test]
fn test_same_lookup_table_through_two_foreign_keys() {
    let mut builder = document(
        r#"
[[select]]
column = "Tests.code"

[[select]]
column = "Codes.description"
alias = "CodeDescription"
order = 1

[[select]]
column = "Tests.secondary_code"
order = 2

[[select]]
column = "Codes.description"
alias = "SecondaryDescription"
order = 3
"#,
    )
    .into_builder()
    .unwrap();

    let sql = builder.sql().unwrap().to_string();
    assert!(sql.contains("lookup_1.description AS CodeDescription"));
    assert!(sql.contains("lookup_2.description AS SecondaryDescription"));
    assert!(sql.contains("LEFT JOIN Codes AS lookup_1 ON Tests.code = lookup_1.code"));
    assert!(sql.contains("LEFT JOIN Codes AS lookup_2 ON Tests.secondary_code = lookup_2.code"));
}

#[test]
fn test_filters_parameters_and_cohort_lines() {
    let mut builder = document_with_settings(
        "top_x = 100",
        r#"
[[select]]
column = "Tests.chi"
extraction_identifier = true

[[select]]
column = "Tests.result"
order = 1

[filter]
operation = "AND"

[[filter.filters]]
name = "high results"
where_sql = "Tests.result > @threshold"
parameters = [{ name = "@threshold", data_type = "decimal(8,2)", value = "7.5" }]

[[custom_lines]]
text = "INNER JOIN Cohort ON Cohort.chi = Tests.chi"
location = "join_info_join"

[[custom_lines]]
text = "Cohort.project = 12"
location = "where"

[identifier_substitution]
select_sql = "Cohort.release_id"
alias = "ReleaseId"
"#,
    )
    .into_builder()
    .unwrap();

    let sql = builder.sql().unwrap().to_string();
    assert!(sql.starts_with("DECLARE @threshold AS decimal(8,2);\nSET @threshold=7.5;\nSELECT\nTOP 100\n"));
    assert!(sql.contains("Cohort.release_id AS ReleaseId,\nTests.result"));
    assert!(sql.contains("FROM\nTests\nINNER JOIN Cohort ON Cohort.chi = Tests.chi\nWHERE\n"));
    assert!(sql.ends_with("(\nTests.result > @threshold\n)\nAND\nCohort.project = 12"));

    builder.set_dialect(SqlDialect::PostgreSql);
    let sql = builder.sql().unwrap().to_string();
    assert!(!sql.contains("TOP 100"));
    assert!(sql.ends_with("\nLIMIT 100"));
}

#[test]
fn test_unjoinable_tables_fail() {
    let mut builder = QueryDocument::from_toml_str(
        r#"
[[tables]]
name = "Tests"
primary = true
columns = [{ name = "chi" }]

[[tables]]
name = "Prescribing"
columns = [{ name = "chi" }]

[[select]]
column = "Tests.chi"

[[select]]
column = "Prescribing.chi"
alias = "prescribing_chi"
"#,
    )
    .unwrap()
    .into_builder()
    .unwrap();

    let err = builder.build().unwrap_err();
    assert!(matches!(err, QueryBuildingError::UnjoinedTables { .. }));
    assert!(err.to_string().contains("no JoinInfo path could be found"));

    let notifier = ToMemoryCheckNotifier::new();
    builder.check(&notifier).unwrap();
    assert_eq!(notifier.worst(), CheckResult::Fail);
}

#[test]
fn test_unknown_column_reference() {
    let err = document(
        r#"
[[select]]
column = "Tests.missing"
"#,
    )
    .into_builder()
    .unwrap_err();

    assert!(err.to_string().contains("Unknown column"));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "dialect = \"postgresql\"\ntop_x = 5\n{BIOCHEMISTRY}\n[[select]]\ncolumn = \"Tests.chi\"\n"
    )
    .unwrap();
    file.flush().unwrap();

    let mut builder = QueryDocument::load(file.path()).unwrap().into_builder().unwrap();
    assert_eq!(builder.sql().unwrap(), "SELECT\nTests.chi\nFROM\nTests\nLIMIT 5");
}
