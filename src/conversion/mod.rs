// ABOUTME: MySQL to SQLite conversion engine
// ABOUTME: Introspection, type mapping, DDL/DML generation, and concurrent coordination

pub mod catalog;
pub mod coordinator;
pub mod ddl;
pub mod dml;
pub mod memory;
pub mod output;
pub mod registry;
pub mod schema;
pub mod typemap;

pub use catalog::{Catalog, Row, TableInfo, TableKind, Value};
pub use coordinator::{ConversionResults, Coordinator};
pub use output::{render_script, write_script};
pub use registry::IndexNameRegistry;
pub use schema::{Column, IndexDefinition, IndexStatistic, TableSchema};
pub use typemap::{classify, StorageClass};

/// Tables converted at the same time unless configured otherwise
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Rows per INSERT statement unless configured otherwise
pub const DEFAULT_PAGE_SIZE: u64 = 2000;

/// How identifiers are written into the generated script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierStyle {
    /// Emit names as-is
    #[default]
    Bare,
    /// Wrap names in double quotes, doubling embedded quotes
    Quoted,
}

impl IdentifierStyle {
    pub fn quote(&self, identifier: &str) -> String {
        match self {
            IdentifierStyle::Bare => identifier.to_string(),
            IdentifierStyle::Quoted => format!("\"{}\"", identifier.replace('"', "\"\"")),
        }
    }
}

/// Tunables for one conversion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Maximum number of tables converted simultaneously
    pub concurrency: usize,
    /// Rows read per page, and so per INSERT statement
    pub page_size: u64,
    pub identifier_style: IdentifierStyle,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
            identifier_style: IdentifierStyle::Bare,
        }
    }
}
