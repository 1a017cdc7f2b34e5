// ABOUTME: MySQL column type to SQLite storage class mapping
// ABOUTME: Pure, total classification used by both DDL and value formatting

use std::fmt;

/// SQLite storage class a MySQL column is converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Integer => "INTEGER",
            StorageClass::Real => "REAL",
            StorageClass::Text => "TEXT",
            StorageClass::Blob => "BLOB",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const TEMPORAL_TYPES: &[&str] = &["DATE", "TIME", "YEAR", "DATETIME", "TIMESTAMP"];

/// Classify a MySQL `DATA_TYPE` name into a SQLite storage class
///
/// Matching is case-insensitive. Unknown types (ENUM, JSON, BIT, ...) fall
/// back to TEXT, so this never fails.
///
/// # Examples
///
/// ```
/// # use mysql2sqlite::conversion::typemap::{classify, StorageClass};
/// assert_eq!(classify("bigint"), StorageClass::Integer);
/// assert_eq!(classify("DECIMAL"), StorageClass::Real);
/// assert_eq!(classify("datetime"), StorageClass::Text);
/// assert_eq!(classify("longblob"), StorageClass::Blob);
/// assert_eq!(classify("geometry"), StorageClass::Text);
/// ```
pub fn classify(source_type: &str) -> StorageClass {
    match source_type.trim().to_ascii_uppercase().as_str() {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" => {
            StorageClass::Integer
        }
        "FLOAT" | "DOUBLE" | "DECIMAL" => StorageClass::Real,
        "DATE" | "TIME" | "YEAR" | "DATETIME" | "TIMESTAMP" | "CHAR" | "VARCHAR" | "TINYTEXT"
        | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => StorageClass::Text,
        "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => StorageClass::Blob,
        _ => StorageClass::Text,
    }
}

/// Whether values of this source type need temporal normalization
pub fn is_temporal(source_type: &str) -> bool {
    let source_type = source_type.trim();
    TEMPORAL_TYPES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(source_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_integer_types() {
        for name in ["TINYINT", "SMALLINT", "MEDIUMINT", "INT", "INTEGER", "BIGINT"] {
            assert_eq!(classify(name), StorageClass::Integer, "{}", name);
        }
    }

    #[test]
    fn test_classify_real_types() {
        for name in ["FLOAT", "DOUBLE", "DECIMAL"] {
            assert_eq!(classify(name), StorageClass::Real, "{}", name);
        }
    }

    #[test]
    fn test_classify_text_and_temporal_types() {
        for name in [
            "DATE",
            "TIME",
            "YEAR",
            "DATETIME",
            "TIMESTAMP",
            "CHAR",
            "VARCHAR",
            "TINYTEXT",
            "TEXT",
            "MEDIUMTEXT",
            "LONGTEXT",
        ] {
            assert_eq!(classify(name), StorageClass::Text, "{}", name);
        }
    }

    #[test]
    fn test_classify_blob_types() {
        for name in ["TINYBLOB", "BLOB", "MEDIUMBLOB", "LONGBLOB"] {
            assert_eq!(classify(name), StorageClass::Blob, "{}", name);
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(classify("int"), classify("INT"));
        assert_eq!(classify("Int"), classify("INT"));
        assert_eq!(classify("mediumBlob"), StorageClass::Blob);
    }

    #[test]
    fn test_classify_unknown_defaults_to_text() {
        for name in ["", "enum", "json", "bit", "varbinary", "geometry", "int unsigned"] {
            assert_eq!(classify(name), StorageClass::Text, "{:?}", name);
        }
    }

    #[test]
    fn test_is_temporal() {
        assert!(is_temporal("datetime"));
        assert!(is_temporal("YEAR"));
        assert!(!is_temporal("varchar"));
        assert!(!is_temporal("int"));
    }

    #[test]
    fn test_storage_class_display() {
        assert_eq!(StorageClass::Integer.to_string(), "INTEGER");
        assert_eq!(StorageClass::Blob.to_string(), "BLOB");
    }
}
