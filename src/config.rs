// ABOUTME: Ignore specification for tables and columns left out of a conversion
// ABOUTME: Loaded from a TOML file and merged with command-line table exclusions

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
struct IgnoreFile {
    #[serde(default)]
    ignores: Vec<IgnoreEntry>,
}

#[derive(Debug, Deserialize)]
struct IgnoreEntry {
    table: String,
    #[serde(default)]
    columns: Vec<String>,
}

/// Tables excluded outright and per-table excluded columns
///
/// A table listed without columns is excluded entirely. Exclusion always
/// wins over column-level rules for the same table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    tables: BTreeSet<String>,
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl IgnoreRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rules from TOML text
    ///
    /// # Examples
    ///
    /// ```
    /// # use mysql2sqlite::config::IgnoreRules;
    /// let rules = IgnoreRules::from_toml_str(r#"
    /// [[ignores]]
    /// table = "audit_log"
    ///
    /// [[ignores]]
    /// table = "users"
    /// columns = ["password_hash"]
    /// "#).unwrap();
    ///
    /// assert!(rules.is_table_excluded("audit_log"));
    /// assert!(!rules.is_table_excluded("users"));
    /// assert!(rules.excluded_columns("users").contains("password_hash"));
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: IgnoreFile =
            toml::from_str(content).context("Failed to parse ignore specification")?;

        let mut rules = Self::new();
        for entry in file.ignores {
            if entry.columns.is_empty() {
                rules.exclude_table(entry.table);
            } else {
                rules.exclude_columns(entry.table, entry.columns);
            }
        }
        Ok(rules)
    }

    pub fn exclude_table(&mut self, table: impl Into<String>) {
        let table = table.into();
        self.columns.remove(&table);
        self.tables.insert(table);
    }

    pub fn exclude_columns<I, S>(&mut self, table: impl Into<String>, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        if self.tables.contains(&table) {
            return;
        }
        self.columns
            .entry(table)
            .or_default()
            .extend(columns.into_iter().map(Into::into));
    }

    pub fn is_table_excluded(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    /// Columns of `table` to leave out; empty when none are excluded
    pub fn excluded_columns(&self, table: &str) -> HashSet<String> {
        self.columns
            .get(table)
            .map(|columns| columns.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty()
    }

    /// Fold in tables excluded on the command line
    pub fn merge_excluded_tables<I, S>(&mut self, tables: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for table in tables {
            let table: String = table.into();
            let trimmed = table.trim();
            if !trimmed.is_empty() {
                self.exclude_table(trimmed);
            }
        }
    }
}

/// Load an ignore specification from a TOML file
///
/// A missing, unreadable, or malformed file is an error.
pub fn load_ignore_rules_from_file(path: impl AsRef<Path>) -> Result<IgnoreRules> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ignore file '{}'", path.display()))?;

    let rules = IgnoreRules::from_toml_str(&content)
        .with_context(|| format!("Invalid ignore file '{}'", path.display()))?;

    tracing::debug!(
        "Loaded ignore rules from '{}': {} table(s) excluded, {} table(s) with excluded columns",
        path.display(),
        rules.tables.len(),
        rules.columns.len()
    );

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_table_without_columns_is_fully_excluded() {
        let rules = IgnoreRules::from_toml_str(
            r#"
            [[ignores]]
            table = "sessions"
            columns = []
            "#,
        )
        .unwrap();

        assert!(rules.is_table_excluded("sessions"));
        assert!(rules.excluded_columns("sessions").is_empty());
    }

    #[test]
    fn test_column_rules_accumulate() {
        let rules = IgnoreRules::from_toml_str(
            r#"
            [[ignores]]
            table = "users"
            columns = ["password_hash"]

            [[ignores]]
            table = "users"
            columns = ["api_token"]
            "#,
        )
        .unwrap();

        let excluded = rules.excluded_columns("users");
        assert_eq!(excluded.len(), 2);
        assert!(excluded.contains("password_hash"));
        assert!(excluded.contains("api_token"));
        assert!(!rules.is_table_excluded("users"));
    }

    #[test]
    fn test_full_exclusion_wins() {
        let mut rules = IgnoreRules::new();
        rules.exclude_columns("orders", ["note"]);
        rules.exclude_table("orders");
        rules.exclude_columns("orders", ["total"]);

        assert!(rules.is_table_excluded("orders"));
        assert!(rules.excluded_columns("orders").is_empty());
    }

    #[test]
    fn test_empty_document() {
        let rules = IgnoreRules::from_toml_str("").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        assert!(IgnoreRules::from_toml_str("[[ignores]]\ncolumns = [\"a\"]").is_err());
        assert!(IgnoreRules::from_toml_str("ignores = 5").is_err());
    }

    #[test]
    fn test_merge_excluded_tables() {
        let mut rules = IgnoreRules::new();
        rules.merge_excluded_tables(vec!["logs", " tmp ", ""]);

        assert!(rules.is_table_excluded("logs"));
        assert!(rules.is_table_excluded("tmp"));
        assert!(!rules.is_table_excluded(""));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[[ignores]]\ntable = \"cache\"").unwrap();

        let rules = load_ignore_rules_from_file(file.path()).unwrap();
        assert!(rules.is_table_excluded("cache"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_ignore_rules_from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read ignore file"));
    }
}
