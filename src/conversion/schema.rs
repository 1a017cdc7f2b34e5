// ABOUTME: Table introspection for conversion planning
// ABOUTME: Loads ordered columns and groups index statistics into key definitions

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};

use super::catalog::Catalog;
use super::typemap::{self, StorageClass};
use crate::utils::sanitize_identifier;

/// Name MySQL reserves for the primary key index
pub const PRIMARY_INDEX: &str = "PRIMARY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Raw `DATA_TYPE` as reported by the catalog
    pub source_type: String,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            source_type: source_type.into(),
            nullable,
        }
    }

    pub fn storage_class(&self) -> StorageClass {
        typemap::classify(&self.source_type)
    }

    pub fn is_temporal(&self) -> bool {
        typemap::is_temporal(&self.source_type)
    }
}

/// One row of `INFORMATION_SCHEMA.STATISTICS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatistic {
    pub index_name: String,
    /// 1-based position of the column within the index
    pub seq_in_index: u32,
    /// `None` for a functional key part, which indexes an expression
    pub column_name: Option<String>,
    pub non_unique: bool,
}

impl IndexStatistic {
    pub fn new(
        index_name: impl Into<String>,
        seq_in_index: u32,
        column_name: impl Into<String>,
        non_unique: bool,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            seq_in_index,
            column_name: Some(column_name.into()),
            non_unique,
        }
    }

    /// A functional key part with no backing column
    pub fn expression(index_name: impl Into<String>, seq_in_index: u32, non_unique: bool) -> Self {
        Self {
            index_name: index_name.into(),
            seq_in_index,
            column_name: None,
            non_unique,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    /// Column names in `seq_in_index` order
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX
    }
}

/// Group raw statistic rows into unique index definitions keyed by name
///
/// Rows are ordered by `seq_in_index` within each index, and uniqueness is
/// taken from the row at position 1. Non-unique indexes are discarded, and so
/// is any index that cannot be reproduced column for column: positions must
/// run 1..=n without gaps and every part must name a column.
pub fn group_indexes(stats: &[IndexStatistic]) -> BTreeMap<String, IndexDefinition> {
    let mut grouped: BTreeMap<&str, Vec<&IndexStatistic>> = BTreeMap::new();
    for stat in stats {
        grouped.entry(stat.index_name.as_str()).or_default().push(stat);
    }

    grouped
        .into_iter()
        .filter_map(|(name, mut rows)| {
            rows.sort_by_key(|row| row.seq_in_index);
            let first = rows.first().filter(|row| row.seq_in_index == 1)?;
            if first.non_unique {
                return None;
            }

            let contiguous = rows
                .iter()
                .zip(1u32..)
                .all(|(row, position)| row.seq_in_index == position);
            if !contiguous {
                tracing::warn!(
                    "Skipping index '{}': key positions are not contiguous",
                    sanitize_identifier(name)
                );
                return None;
            }

            let Some(columns) = rows
                .iter()
                .map(|row| row.column_name.clone())
                .collect::<Option<Vec<_>>>()
            else {
                tracing::warn!(
                    "Skipping index '{}': functional key parts cannot be converted",
                    sanitize_identifier(name)
                );
                return None;
            };

            let definition = IndexDefinition {
                name: name.to_string(),
                columns,
                unique: true,
            };
            Some((name.to_string(), definition))
        })
        .collect()
}

/// Everything the DDL and DML builders need to know about one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<IndexDefinition>,
    /// Unique, non-primary indexes ordered by name
    pub unique_indexes: Vec<IndexDefinition>,
}

impl TableSchema {
    /// Assemble a schema from ordered columns and grouped index definitions
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        indexes: BTreeMap<String, IndexDefinition>,
    ) -> Self {
        let mut primary_key = None;
        let mut unique_indexes = Vec::new();
        for (_, definition) in indexes {
            if definition.is_primary() {
                primary_key = Some(definition);
            } else {
                unique_indexes.push(definition);
            }
        }

        Self {
            name: name.into(),
            columns,
            primary_key,
            unique_indexes,
        }
    }
}

/// Introspect one table, honouring a set of excluded column names
///
/// Returns `None` when the catalog reports no (remaining) columns, in which
/// case the table contributes nothing to the output. Indexes referencing an
/// excluded column are dropped so the DDL never names a missing column.
pub async fn introspect_table<C: Catalog + ?Sized>(
    catalog: &C,
    table: &str,
    excluded_columns: &HashSet<String>,
) -> Result<Option<TableSchema>> {
    let columns: Vec<Column> = catalog
        .fetch_columns(table)
        .await
        .with_context(|| format!("Failed to read columns of table '{}'", table))?
        .into_iter()
        .filter(|column| !excluded_columns.contains(&column.name))
        .collect();

    if columns.is_empty() {
        tracing::debug!(
            "Table '{}' has no columns to convert, skipping",
            sanitize_identifier(table)
        );
        return Ok(None);
    }

    let stats = catalog
        .fetch_index_statistics(table)
        .await
        .with_context(|| format!("Failed to read index statistics of table '{}'", table))?;

    let mut indexes = group_indexes(&stats);
    indexes.retain(|name, definition| {
        let references_excluded = definition
            .columns
            .iter()
            .any(|column| excluded_columns.contains(column));
        if references_excluded {
            tracing::warn!(
                "Dropping index '{}' on '{}': it references an ignored column",
                sanitize_identifier(name),
                sanitize_identifier(table)
            );
        }
        !references_excluded
    });

    tracing::debug!(
        "Introspected '{}': {} columns, {} unique indexes",
        sanitize_identifier(table),
        columns.len(),
        indexes.len()
    );

    Ok(Some(TableSchema::new(table, columns, indexes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::memory::{MemoryCatalog, MemoryTable};

    #[test]
    fn test_group_indexes_orders_by_sequence() {
        let stats = vec![
            IndexStatistic::new("PRIMARY", 2, "tenant_id", false),
            IndexStatistic::new("PRIMARY", 1, "id", false),
        ];

        let indexes = group_indexes(&stats);

        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes["PRIMARY"].columns, vec!["id", "tenant_id"]);
        assert!(indexes["PRIMARY"].is_primary());
    }

    #[test]
    fn test_group_indexes_discards_non_unique() {
        let stats = vec![
            IndexStatistic::new("idx_email", 1, "email", false),
            IndexStatistic::new("idx_created", 1, "created_at", true),
            IndexStatistic::new("idx_created", 2, "id", true),
        ];

        let indexes = group_indexes(&stats);

        assert_eq!(indexes.len(), 1);
        assert!(indexes.contains_key("idx_email"));
        assert!(indexes["idx_email"].unique);
    }

    #[test]
    fn test_group_indexes_uniqueness_comes_from_first_position() {
        // Only the row at position 1 decides uniqueness.
        let stats = vec![
            IndexStatistic::new("idx_mixed", 2, "b", true),
            IndexStatistic::new("idx_mixed", 1, "a", false),
        ];

        let indexes = group_indexes(&stats);

        assert_eq!(indexes["idx_mixed"].columns, vec!["a", "b"]);
    }

    #[test]
    fn test_group_indexes_without_first_position_is_dropped() {
        let stats = vec![IndexStatistic::new("idx_partial", 2, "b", false)];
        assert!(group_indexes(&stats).is_empty());
    }

    #[test]
    fn test_group_indexes_with_gap_is_dropped() {
        let stats = vec![
            IndexStatistic::new("idx_gap", 1, "a", false),
            IndexStatistic::new("idx_gap", 3, "c", false),
            IndexStatistic::new("idx_ok", 1, "a", false),
        ];

        let indexes = group_indexes(&stats);

        assert!(!indexes.contains_key("idx_gap"));
        assert!(indexes.contains_key("idx_ok"));
    }

    #[test]
    fn test_group_indexes_with_functional_part_is_dropped() {
        // UNIQUE (a, (lower(b))): narrowing it to (a) would reject rows
        // MySQL accepted.
        let stats = vec![
            IndexStatistic::new("idx_func", 1, "a", false),
            IndexStatistic::expression("idx_func", 2, false),
        ];
        assert!(group_indexes(&stats).is_empty());

        let leading = vec![
            IndexStatistic::expression("idx_lead", 1, false),
            IndexStatistic::new("idx_lead", 2, "a", false),
        ];
        assert!(group_indexes(&leading).is_empty());
    }

    #[test]
    fn test_group_indexes_empty() {
        assert!(group_indexes(&[]).is_empty());
    }

    #[test]
    fn test_table_schema_splits_primary_key() {
        let stats = vec![
            IndexStatistic::new("PRIMARY", 1, "id", false),
            IndexStatistic::new("uniq_email", 1, "email", false),
        ];
        let schema = TableSchema::new(
            "users",
            vec![Column::new("id", "int", false)],
            group_indexes(&stats),
        );

        assert_eq!(schema.primary_key.unwrap().columns, vec!["id"]);
        assert_eq!(schema.unique_indexes.len(), 1);
        assert_eq!(schema.unique_indexes[0].name, "uniq_email");
    }

    #[tokio::test]
    async fn test_introspect_unknown_table_returns_none() {
        let catalog = MemoryCatalog::new();
        let schema = introspect_table(&catalog, "missing", &HashSet::new())
            .await
            .unwrap();
        assert!(schema.is_none());
    }

    #[tokio::test]
    async fn test_introspect_table_without_indexes() {
        let catalog = MemoryCatalog::new().with_table(
            MemoryTable::new("logs")
                .column("message", "text", true)
                .column("level", "varchar", false),
        );

        let schema = introspect_table(&catalog, "logs", &HashSet::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].name, "message");
        assert!(schema.primary_key.is_none());
        assert!(schema.unique_indexes.is_empty());
    }

    #[tokio::test]
    async fn test_introspect_drops_excluded_columns_and_their_indexes() {
        let catalog = MemoryCatalog::new().with_table(
            MemoryTable::new("users")
                .column("id", "int", false)
                .column("email", "varchar", false)
                .column("password_hash", "varchar", false)
                .index("PRIMARY", 1, "id", false)
                .index("uniq_email", 1, "email", false)
                .index("uniq_hash", 1, "password_hash", false),
        );
        let excluded: HashSet<String> = ["password_hash".to_string()].into_iter().collect();

        let schema = introspect_table(&catalog, "users", &excluded)
            .await
            .unwrap()
            .unwrap();

        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email"]);
        assert_eq!(schema.unique_indexes.len(), 1);
        assert_eq!(schema.unique_indexes[0].name, "uniq_email");
        assert!(schema.primary_key.is_some());
    }

    #[tokio::test]
    async fn test_introspect_skips_functional_unique_index() {
        let catalog = MemoryCatalog::new().with_table(
            MemoryTable::new("people")
                .column("id", "int", false)
                .column("email", "varchar", false)
                .index("PRIMARY", 1, "id", false)
                .index("uniq_email_ci", 1, "id", false)
                .expression_index("uniq_email_ci", 2, false),
        );

        let schema = introspect_table(&catalog, "people", &HashSet::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(schema.primary_key.unwrap().columns, vec!["id"]);
        assert!(schema.unique_indexes.is_empty());
    }

    #[tokio::test]
    async fn test_introspect_all_columns_excluded() {
        let catalog =
            MemoryCatalog::new().with_table(MemoryTable::new("secrets").column("token", "text", true));
        let excluded: HashSet<String> = ["token".to_string()].into_iter().collect();

        let schema = introspect_table(&catalog, "secrets", &excluded).await.unwrap();
        assert!(schema.is_none());
    }
}
