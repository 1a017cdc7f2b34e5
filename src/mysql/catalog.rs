// ABOUTME: Catalog implementation over MySQL INFORMATION_SCHEMA
// ABOUTME: Lists tables, reads column and index metadata, and pages through table rows

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row as _;

use crate::conversion::catalog::{Catalog, Row, TableInfo, TableKind, Value};
use crate::conversion::schema::{Column, IndexStatistic};
use crate::conversion::typemap::StorageClass;

/// Quote a MySQL identifier with backticks
fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Select list for a page read; BLOB columns stay binary, the rest are cast to text
fn select_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| {
            let ident = quote_ident(&column.name);
            match column.storage_class() {
                StorageClass::Blob => ident,
                _ => format!("CAST({} AS CHAR) AS {}", ident, ident),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Page query; rows are sorted by `order_by` when key columns are given
fn page_query(database: &str, table: &str, columns: &[Column], order_by: &[String]) -> String {
    let mut query = format!(
        "SELECT {} FROM {}.{}",
        select_list(columns),
        quote_ident(database),
        quote_ident(table)
    );
    if !order_by.is_empty() {
        let keys: Vec<String> = order_by.iter().map(|name| quote_ident(name)).collect();
        query.push_str(" ORDER BY ");
        query.push_str(&keys.join(", "));
    }
    query.push_str(" LIMIT ? OFFSET ?");
    query
}

/// Build a statistic from a decoded `STATISTICS` row
///
/// A NULL column name marks a functional key part. An out-of-range position
/// becomes 0, which no index accepts.
fn index_statistic(
    index_name: String,
    seq_in_index: i64,
    column_name: Option<String>,
    non_unique: i64,
) -> IndexStatistic {
    let seq_in_index = u32::try_from(seq_in_index).unwrap_or(0);
    let non_unique = non_unique != 0;
    match column_name {
        Some(column_name) => IndexStatistic::new(index_name, seq_in_index, column_name, non_unique),
        None => IndexStatistic::expression(index_name, seq_in_index, non_unique),
    }
}

/// Source catalog for one MySQL database
#[derive(Debug, Clone)]
pub struct MySqlCatalog {
    pool: MySqlPool,
    database: String,
}

impl MySqlCatalog {
    pub fn new(pool: MySqlPool, database: impl Into<String>) -> Self {
        Self {
            pool,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Whether the database is present in `SCHEMATA`
    pub async fn schema_exists(&self) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM INFORMATION_SCHEMA.SCHEMATA WHERE SCHEMA_NAME = ? LIMIT 1",
        )
        .bind(&self.database)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to look up database '{}'", self.database))?;

        Ok(row.is_some())
    }

    fn decode_row(row: &MySqlRow, columns: &[Column]) -> Result<Row> {
        columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let raw: Option<Vec<u8>> = row
                    .try_get(idx)
                    .with_context(|| format!("Failed to decode column '{}'", column.name))?;

                Ok(match raw {
                    None => Value::Null,
                    Some(bytes) if column.storage_class() == StorageClass::Blob => {
                        Value::Bytes(bytes)
                    }
                    Some(bytes) => match String::from_utf8(bytes) {
                        Ok(text) => Value::Text(text),
                        Err(e) => Value::Text(String::from_utf8_lossy(e.as_bytes()).into_owned()),
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl Catalog for MySqlCatalog {
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let rows: Vec<MySqlRow> = sqlx::query(
            r#"
            SELECT
                CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME,
                CAST(TABLE_TYPE AS CHAR(64)) AS TABLE_TYPE
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ?
            ORDER BY TABLE_NAME ASC
            "#,
        )
        .bind(&self.database)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list tables of database '{}'", self.database))?;

        rows.iter()
            .map(|row| -> Result<TableInfo, sqlx::Error> {
                let name: String = row.try_get("TABLE_NAME")?;
                let table_type: String = row.try_get("TABLE_TYPE")?;
                Ok(TableInfo {
                    name,
                    kind: TableKind::from_table_type(&table_type),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .context("Failed to decode table list")
    }

    async fn fetch_columns(&self, table: &str) -> Result<Vec<Column>> {
        let rows: Vec<MySqlRow> = sqlx::query(
            r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(DATA_TYPE AS CHAR(64)) AS DATA_TYPE,
                CAST(IF(IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS is_nullable
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION ASC
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read columns of table '{}'", table))?;

        rows.iter()
            .map(|row| -> Result<Column, sqlx::Error> {
                let name: String = row.try_get("COLUMN_NAME")?;
                let data_type: String = row.try_get("DATA_TYPE")?;
                let is_nullable: i64 = row.try_get("is_nullable")?;
                Ok(Column::new(name, data_type, is_nullable == 1))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .with_context(|| format!("Failed to decode columns of table '{}'", table))
    }

    async fn fetch_index_statistics(&self, table: &str) -> Result<Vec<IndexStatistic>> {
        let rows: Vec<MySqlRow> = sqlx::query(
            r#"
            SELECT
                CAST(INDEX_NAME AS CHAR(255)) AS INDEX_NAME,
                CAST(SEQ_IN_INDEX AS SIGNED) AS SEQ_IN_INDEX,
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(NON_UNIQUE AS SIGNED) AS NON_UNIQUE
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            "#,
        )
        .bind(&self.database)
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read index statistics of table '{}'", table))?;

        rows.iter()
            .map(|row| -> Result<IndexStatistic, sqlx::Error> {
                let index_name: String = row.try_get("INDEX_NAME")?;
                let seq_in_index: i64 = row.try_get("SEQ_IN_INDEX")?;
                let column_name: Option<String> = row.try_get("COLUMN_NAME")?;
                let non_unique: i64 = row.try_get("NON_UNIQUE")?;

                Ok(index_statistic(index_name, seq_in_index, column_name, non_unique))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .with_context(|| format!("Failed to decode index statistics of table '{}'", table))
    }

    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[Column],
        order_by: &[String],
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>> {
        let query = page_query(&self.database, table, columns, order_by);

        let rows: Vec<MySqlRow> = sqlx::query(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to read rows of table '{}'", table))?;

        rows.iter()
            .map(|row| Self::decode_row(row, columns))
            .collect()
    }
}
