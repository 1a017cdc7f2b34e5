// ABOUTME: Final SQLite script rendering
// ABOUTME: Orders table blocks by name and frames them with foreign-key pragmas

use anyhow::{Context, Result};
use std::io::Write;

use super::coordinator::ConversionResults;

pub const FOREIGN_KEYS_OFF: &str = "PRAGMA foreign_keys = false;";
pub const FOREIGN_KEYS_ON: &str = "PRAGMA foreign_keys = true;";

/// Render the complete script
///
/// Table blocks are sorted by name (byte order), separated by one blank line,
/// and framed by foreign-key pragmas. No blocks means an empty script.
pub fn render_script(results: &ConversionResults) -> String {
    let blocks = results.sorted_blocks();
    if blocks.is_empty() {
        return String::new();
    }

    let mut script = String::new();
    script.push_str(FOREIGN_KEYS_OFF);
    script.push_str("\n\n");
    script.push_str(
        &blocks
            .iter()
            .map(|(_, sql)| *sql)
            .collect::<Vec<_>>()
            .join("\n\n"),
    );
    script.push_str("\n\n");
    script.push_str(FOREIGN_KEYS_ON);
    script.push('\n');
    script
}

/// Render the script into `writer` and flush it
pub fn write_script<W: Write>(writer: &mut W, results: &ConversionResults) -> Result<()> {
    writer
        .write_all(render_script(results).as_bytes())
        .context("Failed to write SQL script")?;
    writer.flush().context("Failed to flush SQL script")?;
    Ok(())
}
