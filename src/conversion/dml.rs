// ABOUTME: SQLite INSERT generation from paged source rows
// ABOUTME: Formats each value by its storage class, normalizing temporal values

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::catalog::{Catalog, Row, Value};
use super::schema::{Column, TableSchema};
use super::typemap::StorageClass;
use super::IdentifierStyle;
use crate::utils::sanitize_identifier;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quote a string literal, doubling embedded single quotes
pub fn quote_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Normalize a MySQL temporal value to `YYYY-MM-DD HH:MM:SS`
///
/// DATE gains a midnight time, YEAR becomes January 1st, TIME stays a bare
/// `HH:MM:SS`. Returns `None` for anything chrono cannot parse, such as zero
/// dates or TIME values outside a single day.
///
/// # Examples
///
/// ```
/// # use mysql2sqlite::conversion::dml::normalize_temporal;
/// assert_eq!(normalize_temporal("2020-01-02").as_deref(), Some("2020-01-02 00:00:00"));
/// assert_eq!(normalize_temporal("2020-01-02 10:00:00.250").as_deref(), Some("2020-01-02 10:00:00"));
/// assert_eq!(normalize_temporal("0000-00-00 00:00:00"), None);
/// ```
pub fn normalize_temporal(raw: &str) -> Option<String> {
    let raw = raw.trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.format(DATETIME_FORMAT).to_string());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).format(DATETIME_FORMAT).to_string());
    }

    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        let year = raw.parse::<i32>().ok()?;
        let date = NaiveDate::from_ymd_opt(year, 1, 1)?;
        return Some(date.and_time(NaiveTime::MIN).format(DATETIME_FORMAT).to_string());
    }

    // TIME has no date part to anchor a full timestamp.
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .ok()
        .map(|time| time.format("%H:%M:%S").to_string())
}

/// Render one value as a SQLite literal for the given column
pub fn format_value(value: &Value, column: &Column) -> String {
    let Some(text) = value.as_string() else {
        return "NULL".to_string();
    };

    match column.storage_class() {
        StorageClass::Integer | StorageClass::Real => text.into_owned(),
        StorageClass::Text if column.is_temporal() => match normalize_temporal(&text) {
            Some(normalized) => quote_text(&normalized),
            None => quote_text(&text),
        },
        StorageClass::Text => quote_text(&text),
        StorageClass::Blob => format!("'{}'", text),
    }
}

/// One multi-row INSERT statement for a page of rows
pub fn insert_statement(
    table: &str,
    columns: &[Column],
    rows: &[Row],
    style: IdentifierStyle,
) -> String {
    let column_names = columns
        .iter()
        .map(|column| style.quote(&column.name))
        .collect::<Vec<_>>()
        .join(",");

    let tuples = rows
        .iter()
        .map(|row| {
            let values = columns
                .iter()
                .zip(row.iter())
                .map(|(column, value)| format_value(value, column))
                .collect::<Vec<_>>()
                .join(",");
            format!("({})", values)
        })
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "INSERT INTO {} ({}) VALUES {};",
        style.quote(table),
        column_names,
        tuples
    )
}

/// Read a table page by page and build one INSERT per non-empty page
///
/// Pages are requested with an increasing offset until one comes back empty,
/// so an empty table yields no statements. Tables with a primary key are
/// paged in key order.
pub async fn build_inserts<C: Catalog + ?Sized>(
    catalog: &C,
    schema: &TableSchema,
    page_size: u64,
    style: IdentifierStyle,
) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    let mut offset: u64 = 0;
    let page_size = page_size.max(1);
    let order_by = schema
        .primary_key
        .as_ref()
        .map(|pk| pk.columns.as_slice())
        .unwrap_or_default();

    loop {
        let rows = catalog
            .fetch_rows(&schema.name, &schema.columns, order_by, offset, page_size)
            .await
            .with_context(|| {
                format!(
                    "Failed to read rows {}..{} of table '{}'",
                    offset,
                    offset + page_size,
                    schema.name
                )
            })?;

        if rows.is_empty() {
            break;
        }

        statements.push(insert_statement(&schema.name, &schema.columns, &rows, style));
        offset += page_size;
    }

    tracing::debug!(
        "Built {} INSERT statement(s) for '{}'",
        statements.len(),
        sanitize_identifier(&schema.name)
    );

    Ok(statements)
}
