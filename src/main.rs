// ABOUTME: CLI entry point for mysql2sqlite
// ABOUTME: Parses arguments, sets up logging, and runs the convert command

use clap::Parser;
use mysql2sqlite::commands::{self, ConvertArgs};
use mysql2sqlite::conversion::{
    ConvertOptions, IdentifierStyle, DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mysql2sqlite")]
#[command(about = "Convert a MySQL database into a SQLite script", long_about = None)]
#[command(version)]
struct Cli {
    /// Source server (format: <user>:<password>@<host>:<port>)
    #[arg(short, long)]
    server: String,
    /// Source database name
    #[arg(short, long)]
    db: String,
    /// Path to a TOML ignore file listing tables and columns to skip
    #[arg(short, long = "config")]
    config: Option<PathBuf>,
    /// Exclude these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude_tables: Vec<String>,
    /// Maximum number of tables converted at the same time
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
    /// Rows per INSERT statement
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u64,
    /// Wrap every identifier in double quotes
    #[arg(long)]
    quote_identifiers: bool,
    /// Write the script to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Overwrite an existing output file without prompting
    #[arg(short = 'y', long)]
    yes: bool,
    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set.
    // Logs go to stderr; stdout carries the script.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let identifier_style = if cli.quote_identifiers {
        IdentifierStyle::Quoted
    } else {
        IdentifierStyle::Bare
    };

    commands::convert(ConvertArgs {
        server: cli.server,
        database: cli.db,
        config_path: cli.config,
        exclude_tables: cli.exclude_tables,
        options: ConvertOptions {
            concurrency: cli.concurrency,
            page_size: cli.page_size,
            identifier_style,
        },
        output: cli.output,
        assume_yes: cli.yes,
        show_progress: !cli.no_progress,
    })
    .await
}
