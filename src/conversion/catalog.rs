// ABOUTME: Read-only catalog abstraction consumed by the conversion engine
// ABOUTME: Defines table listing, column/index introspection, and paged row reads

use anyhow::Result;
use async_trait::async_trait;
use std::borrow::Cow;

use super::schema::{Column, IndexStatistic};

/// Kind of object listed in the source catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    BaseTable,
    View,
}

impl TableKind {
    /// Map an `INFORMATION_SCHEMA.TABLES.TABLE_TYPE` value
    pub fn from_table_type(table_type: &str) -> Self {
        match table_type.trim().to_ascii_uppercase().as_str() {
            "BASE TABLE" | "SYSTEM VERSIONED" => TableKind::BaseTable,
            _ => TableKind::View,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub kind: TableKind,
}

impl TableInfo {
    pub fn base_table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::BaseTable,
        }
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::View,
        }
    }
}

/// A single value read from a source row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical string form of the value, `None` for NULL
    pub fn as_string(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(Cow::Owned(v.to_string())),
            Value::UInt(v) => Some(Cow::Owned(v.to_string())),
            Value::Float(v) => Some(Cow::Owned(v.to_string())),
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Row of values, ordered like the columns passed to [`Catalog::fetch_rows`]
pub type Row = Vec<Value>;

/// Read-only access to the source database catalog and its rows
///
/// Every call is attempted once; implementations must not retry, since a
/// failed read aborts the whole run.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Base tables and views of the source database
    async fn list_tables(&self) -> Result<Vec<TableInfo>>;

    /// Columns of `table` in ordinal order; empty when the table is unknown
    async fn fetch_columns(&self, table: &str) -> Result<Vec<Column>>;

    /// Raw index statistic rows of `table`, in no particular order
    async fn fetch_index_statistics(&self, table: &str) -> Result<Vec<IndexStatistic>>;

    /// One page of rows, projecting `columns` in the given order
    ///
    /// Pages are sorted by `order_by` so consecutive offsets neither skip nor
    /// repeat rows. With no key columns the source order is used as is.
    async fn fetch_rows(
        &self,
        table: &str,
        columns: &[Column],
        order_by: &[String],
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Row>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_kind_from_table_type() {
        assert_eq!(TableKind::from_table_type("BASE TABLE"), TableKind::BaseTable);
        assert_eq!(
            TableKind::from_table_type("SYSTEM VERSIONED"),
            TableKind::BaseTable
        );
        assert_eq!(TableKind::from_table_type("VIEW"), TableKind::View);
        assert_eq!(TableKind::from_table_type("SYSTEM VIEW"), TableKind::View);
    }

    #[test]
    fn test_value_as_string() {
        assert_eq!(Value::Null.as_string(), None);
        assert_eq!(Value::Int(-42).as_string().unwrap(), "-42");
        assert_eq!(Value::UInt(u64::MAX).as_string().unwrap(), "18446744073709551615");
        assert_eq!(Value::Float(1.5).as_string().unwrap(), "1.5");
        assert_eq!(Value::from("abc").as_string().unwrap(), "abc");
        assert_eq!(Value::Bytes(b"raw".to_vec()).as_string().unwrap(), "raw");
    }

    #[test]
    fn test_value_from_option() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some(7i64)), Value::Int(7));
    }
}
