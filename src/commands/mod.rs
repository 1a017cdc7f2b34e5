// ABOUTME: Command implementations exposed by the CLI
// ABOUTME: Exports the convert command and its arguments

pub mod convert;

pub use convert::{convert, convert_catalog, ConvertArgs};
