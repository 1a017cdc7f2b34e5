// ABOUTME: End-to-end conversion command from a MySQL database to a SQLite script
// ABOUTME: Validates input, connects, runs the conversion, and writes the script

use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{load_ignore_rules_from_file, IgnoreRules};
use crate::conversion::{write_script, Catalog, ConversionResults, ConvertOptions, Coordinator};
use crate::mysql::{self, MySqlCatalog, ServerSpec};
use crate::utils::{sanitize_identifier, validate_database_name};

/// Everything the convert command needs, as collected from the command line
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    /// `<user>:<password>@<host>:<port>`
    pub server: String,
    pub database: String,
    /// Optional TOML ignore file
    pub config_path: Option<PathBuf>,
    /// Extra tables excluded outright
    pub exclude_tables: Vec<String>,
    pub options: ConvertOptions,
    /// Script destination; stdout when absent
    pub output: Option<PathBuf>,
    /// Overwrite an existing output file without asking
    pub assume_yes: bool,
    pub show_progress: bool,
}

/// Convert a MySQL database into a SQLite script
///
/// Steps:
/// 1. Validates the server specification, database name, and options
/// 2. Loads the ignore specification, if any
/// 3. Connects to the server and checks that the database exists
/// 4. Lists its tables and converts them concurrently
/// 5. Writes the sorted script to stdout or the output file
///
/// # Errors
///
/// Every condition that prevents a complete script is fatal: malformed
/// server or database name, unreadable ignore file, connection failure,
/// unknown database, a database without tables, or any failed catalog read.
///
/// # Examples
///
/// ```no_run
/// # use anyhow::Result;
/// # use mysql2sqlite::commands::{convert, ConvertArgs};
/// # use mysql2sqlite::conversion::ConvertOptions;
/// # async fn example() -> Result<()> {
/// convert(ConvertArgs {
///     server: "root:secret@127.0.0.1:3306".to_string(),
///     database: "shop".to_string(),
///     config_path: None,
///     exclude_tables: vec![],
///     options: ConvertOptions::default(),
///     output: Some("shop.sql".into()),
///     assume_yes: true,
///     show_progress: false,
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn convert(args: ConvertArgs) -> Result<()> {
    tracing::info!("Starting conversion...");

    // Step 1: Validate input
    let spec = ServerSpec::parse(&args.server)?;
    validate_database_name(&args.database)?;
    validate_options(&args.options)?;

    // Step 2: Ignore specification
    let rules = load_rules(args.config_path.as_deref(), &args.exclude_tables)?;

    if let Some(path) = &args.output {
        if !confirm_overwrite(path, args.assume_yes)? {
            bail!("Conversion cancelled by user");
        }
    }

    // Step 3: Connect
    tracing::info!("Connecting to MySQL server {}...", spec);
    let max_connections = u32::try_from(args.options.concurrency).unwrap_or(u32::MAX);
    let pool = mysql::connect_with_retry(&spec, max_connections).await?;
    let catalog = MySqlCatalog::new(pool, &args.database);

    if !catalog.schema_exists().await? {
        bail!("Database '{}' does not exist", args.database);
    }
    tracing::info!("✓ Found database '{}'", args.database);

    // Step 4: Convert
    let progress = if args.show_progress {
        progress_bar()?
    } else {
        ProgressBar::hidden()
    };
    let results = convert_catalog(Arc::new(catalog), rules, args.options, progress).await?;

    // Step 5: Emit
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_script(&mut writer, &results)?;
            tracing::info!("✓ Wrote script to '{}'", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            write_script(&mut writer, &results)?;
        }
    }

    tracing::info!("✅ Conversion complete");
    Ok(())
}

/// List the catalog's tables and convert them
///
/// Fails when the catalog has no tables at all. An empty result (everything
/// skipped or ignored) is only warned about.
pub async fn convert_catalog<C: Catalog + ?Sized + 'static>(
    catalog: Arc<C>,
    rules: IgnoreRules,
    options: ConvertOptions,
    progress: ProgressBar,
) -> Result<ConversionResults> {
    let tables = catalog
        .list_tables()
        .await
        .context("Failed to list source tables")?;

    if tables.is_empty() {
        bail!("Database has no tables");
    }
    tracing::info!("Found {} table(s) and view(s)", tables.len());

    let results = Coordinator::new(catalog, options)
        .with_ignore_rules(rules)
        .with_progress(progress)
        .run(&tables)
        .await?;

    if results.is_empty() {
        tracing::warn!("⚠ No tables were converted; the script will be empty");
    }

    Ok(results)
}

fn validate_options(options: &ConvertOptions) -> Result<()> {
    if options.concurrency == 0 {
        bail!("Concurrency must be at least 1");
    }
    if options.page_size == 0 {
        bail!("Page size must be at least 1");
    }
    Ok(())
}

/// Load the ignore file, if given, and merge command-line exclusions
fn load_rules(config_path: Option<&Path>, exclude_tables: &[String]) -> Result<IgnoreRules> {
    let mut rules = match config_path {
        Some(path) => load_ignore_rules_from_file(path)?,
        None => IgnoreRules::new(),
    };
    rules.merge_excluded_tables(exclude_tables.iter().cloned());

    if !rules.is_empty() {
        tracing::info!("Applying ignore rules");
    }
    for table in exclude_tables {
        tracing::debug!("Excluding table '{}'", sanitize_identifier(table));
    }

    Ok(rules)
}

/// Ask before replacing an existing output file
///
/// Returns `true` when the file may be written. Without a terminal to ask
/// on, an existing file is only replaced with `assume_yes`.
fn confirm_overwrite(path: &Path, assume_yes: bool) -> Result<bool> {
    if assume_yes || !path.exists() {
        return Ok(true);
    }

    if !io::stdin().is_terminal() {
        bail!(
            "Output file '{}' already exists. Use --yes to overwrite it",
            path.display()
        );
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Overwrite existing file '{}'?", path.display()))
        .default(false)
        .interact()
        .context("Failed to get overwrite confirmation")
}

fn progress_bar() -> Result<ProgressBar> {
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );
    Ok(progress)
}
