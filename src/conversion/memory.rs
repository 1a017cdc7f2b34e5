// ABOUTME: In-process catalog implementation backed by plain vectors
// ABOUTME: Lets the conversion engine run without a MySQL server (tests, dry runs)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::catalog::{Catalog, Row, TableInfo, TableKind, Value};
use super::schema::{Column, IndexStatistic};

/// A table (or view) held by [`MemoryCatalog`]
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    kind: TableKind,
    columns: Vec<Column>,
    statistics: Vec<IndexStatistic>,
    rows: Vec<Vec<(String, Value)>>,
    delay: Option<Duration>,
    fail_rows: bool,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::BaseTable,
            columns: Vec::new(),
            statistics: Vec::new(),
            rows: Vec::new(),
            delay: None,
            fail_rows: false,
        }
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self {
            kind: TableKind::View,
            ..Self::new(name)
        }
    }

    pub fn column(mut self, name: &str, source_type: &str, nullable: bool) -> Self {
        self.columns.push(Column::new(name, source_type, nullable));
        self
    }

    pub fn index(mut self, name: &str, seq_in_index: u32, column: &str, non_unique: bool) -> Self {
        self.statistics
            .push(IndexStatistic::new(name, seq_in_index, column, non_unique));
        self
    }

    /// Add a functional key part, which names no column
    pub fn expression_index(mut self, name: &str, seq_in_index: u32, non_unique: bool) -> Self {
        self.statistics
            .push(IndexStatistic::expression(name, seq_in_index, non_unique));
        self
    }

    /// Append a row; values pair up with columns in declaration order
    pub fn row(mut self, values: Vec<Value>) -> Self {
        let row = self
            .columns
            .iter()
            .map(|column| column.name.clone())
            .zip(values)
            .collect();
        self.rows.push(row);
        self
    }

    /// Delay every catalog call for this table, to shape task completion order
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every page read for this table fail
    pub fn failing_rows(mut self) -> Self {
        self.fail_rows = true;
        self
    }
}

/// Catalog that serves tables from memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, MemoryTable>,
    page_reads: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Number of `fetch_rows` calls served so far
    pub fn page_reads(&self) -> usize {
        self.page_reads.load(Ordering::SeqCst)
    }

    async fn lookup(&self, table: &str) -> Option<&MemoryTable> {
        let found = self.tables.get(table)?;
        if let Some(delay) = found.delay {
            tokio::time::sleep(delay).await;
        }
        Some(found)
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn list_tables(&self) -> Result<Vec<TableInfo>> {
        Ok(self
            .tables
            .values()
            .map(|table| TableInfo {
                name: table.name.clone(),
                kind: table.kind,
            })
            .collect())
    }

    async fn fetch_columns(&self, table: &str) -> Result<Vec<Column>> {
        Ok(self
            .lookup(table)
            .await
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn fetch_index_statistics(&self, table: &str) -> Result<Vec<IndexStatistic>> {
        Ok(self
            .lookup(table)
            .await
            .map(|t| t.statistics.clone())
            .unwrap_or_default())
    }

    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[Column],
        _order_by: &[String],
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>> {
        self.page_reads.fetch_add(1, Ordering::SeqCst);

        let Some(found) = self.lookup(table).await else {
            bail!("Table '{}' does not exist", table);
        };
        if found.fail_rows {
            bail!("Simulated read failure on table '{}'", table);
        }

        let page = found
            .rows
            .iter()
            .skip(usize::try_from(offset)?)
            .take(usize::try_from(limit)?)
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        row.iter()
                            .find(|(name, _)| *name == column.name)
                            .map(|(_, value)| value.clone())
                            .unwrap_or(Value::Null)
                    })
                    .collect()
            })
            .collect();

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MemoryCatalog {
        let mut table = MemoryTable::new("numbers").column("n", "int", false);
        for n in 0..5 {
            table = table.row(vec![Value::Int(n)]);
        }
        MemoryCatalog::new()
            .with_table(table)
            .with_table(MemoryTable::view("v_numbers"))
    }

    #[tokio::test]
    async fn test_list_tables_reports_kinds() {
        let tables = catalog().list_tables().await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0], TableInfo::base_table("numbers"));
        assert_eq!(tables[1], TableInfo::view("v_numbers"));
    }

    #[tokio::test]
    async fn test_fetch_rows_pages() {
        let catalog = catalog();
        let columns = catalog.fetch_columns("numbers").await.unwrap();

        let page = catalog.fetch_rows("numbers", &columns, &[], 3, 2).await.unwrap();
        assert_eq!(page, vec![vec![Value::Int(3)], vec![Value::Int(4)]]);

        let empty = catalog.fetch_rows("numbers", &columns, &[], 5, 2).await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(catalog.page_reads(), 2);
    }

    #[tokio::test]
    async fn test_unknown_table_has_no_columns() {
        assert!(catalog().fetch_columns("nope").await.unwrap().is_empty());
    }
}
