// ABOUTME: SQLite DDL generation for converted tables
// ABOUTME: Builds DROP/CREATE TABLE with inlined primary key and CREATE UNIQUE INDEX

use super::schema::{Column, TableSchema};
use super::IdentifierStyle;

fn column_definition(column: &Column, style: IdentifierStyle) -> String {
    let not_null = if column.nullable { "" } else { " NOT NULL" };
    format!(
        "  {} {}{}",
        style.quote(&column.name),
        column.storage_class(),
        not_null
    )
}

fn column_list(columns: &[String], style: IdentifierStyle) -> String {
    columns
        .iter()
        .map(|column| style.quote(column))
        .collect::<Vec<_>>()
        .join(",")
}

/// `DROP TABLE IF EXISTS` followed by the `CREATE TABLE` statement
///
/// Columns keep their ordinal order; the primary key, if any, is inlined as
/// the last entry of the column list.
///
/// # Examples
///
/// ```
/// # use std::collections::BTreeMap;
/// # use mysql2sqlite::conversion::IdentifierStyle;
/// # use mysql2sqlite::conversion::ddl::create_table_statement;
/// # use mysql2sqlite::conversion::schema::{Column, TableSchema};
/// let schema = TableSchema::new("tags", vec![Column::new("label", "varchar", false)], BTreeMap::new());
/// assert_eq!(
///     create_table_statement(&schema, IdentifierStyle::Bare),
///     "DROP TABLE IF EXISTS tags;\nCREATE TABLE tags (\n  label TEXT NOT NULL\n);"
/// );
/// ```
pub fn create_table_statement(schema: &TableSchema, style: IdentifierStyle) -> String {
    let table = style.quote(&schema.name);

    let mut entries: Vec<String> = schema
        .columns
        .iter()
        .map(|column| column_definition(column, style))
        .collect();

    if let Some(primary_key) = &schema.primary_key {
        entries.push(format!(
            "  PRIMARY KEY ({})",
            column_list(&primary_key.columns, style)
        ));
    }

    let mut lines = vec![
        format!("DROP TABLE IF EXISTS {};", table),
        format!("CREATE TABLE {} (", table),
    ];
    if !entries.is_empty() {
        lines.push(entries.join(",\n"));
    }
    lines.push(");".to_string());

    lines.join("\n")
}

/// Standalone `CREATE UNIQUE INDEX` for an already resolved index name
pub fn create_unique_index_statement(
    index_name: &str,
    table: &str,
    columns: &[String],
    style: IdentifierStyle,
) -> String {
    format!(
        "CREATE UNIQUE INDEX {} ON {} ({});",
        style.quote(index_name),
        style.quote(table),
        column_list(columns, style)
    )
}
