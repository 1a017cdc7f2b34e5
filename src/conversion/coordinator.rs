// ABOUTME: Concurrent per-table conversion with race-free result aggregation
// ABOUTME: Worker tasks report to a single aggregator task that owns all shared state

use anyhow::{anyhow, Context, Result};
use indicatif::ProgressBar;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::{JoinError, JoinSet};

use super::catalog::{Catalog, TableInfo, TableKind};
use super::registry::IndexNameRegistry;
use super::schema::introspect_table;
use super::{ddl, dml, ConvertOptions};
use crate::config::IgnoreRules;
use crate::utils::sanitize_identifier;

/// SQL text blocks produced by a run, keyed by table name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionResults {
    table_names: Vec<String>,
    blocks: HashMap<String, String>,
}

impl ConversionResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, sql: impl Into<String>) {
        let table = table.into();
        if !self.blocks.contains_key(&table) {
            self.table_names.push(table.clone());
        }
        self.blocks.insert(table, sql.into());
    }

    pub fn get(&self, table: &str) -> Option<&str> {
        self.blocks.get(table).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks ordered by table name, independent of completion order
    pub fn sorted_blocks(&self) -> Vec<(&str, &str)> {
        let mut names: Vec<&String> = self.table_names.iter().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| {
                self.blocks
                    .get(name)
                    .map(|sql| (name.as_str(), sql.as_str()))
            })
            .collect()
    }
}

#[derive(Debug)]
enum AggregatorMessage {
    ResolveIndexName {
        base: String,
        reply: oneshot::Sender<String>,
    },
    TableConverted {
        table: String,
        sql: String,
    },
}

/// Sole owner of the result set and the index-name registry for one run
async fn run_aggregator(mut rx: mpsc::Receiver<AggregatorMessage>) -> ConversionResults {
    let mut results = ConversionResults::new();
    let mut registry = IndexNameRegistry::new();

    while let Some(message) = rx.recv().await {
        match message {
            AggregatorMessage::ResolveIndexName { base, reply } => {
                let resolved = registry.resolve(&base);
                if resolved != base {
                    tracing::debug!(
                        "Index name '{}' already used, renamed to '{}'",
                        sanitize_identifier(&base),
                        sanitize_identifier(&resolved)
                    );
                }
                // The requesting task may have been aborted; nothing to do then.
                let _ = reply.send(resolved);
            }
            AggregatorMessage::TableConverted { table, sql } => {
                results.insert(table, sql);
            }
        }
    }

    results
}

#[derive(Debug, Clone)]
struct AggregatorHandle {
    tx: mpsc::Sender<AggregatorMessage>,
}

impl AggregatorHandle {
    async fn resolve_index_name(&self, base: &str) -> Result<String> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(AggregatorMessage::ResolveIndexName {
                base: base.to_string(),
                reply,
            })
            .await
            .map_err(|_| anyhow!("Result aggregator stopped before resolving index '{}'", base))?;
        response
            .await
            .with_context(|| format!("Result aggregator dropped request for index '{}'", base))
    }

    async fn submit(&self, table: String, sql: String) -> Result<()> {
        self.tx
            .send(AggregatorMessage::TableConverted { table, sql })
            .await
            .map_err(|_| anyhow!("Result aggregator stopped before accepting table output"))
    }
}

/// Convert a single table: introspect, build DDL and DML, report the block
async fn convert_table<C: Catalog + ?Sized>(
    catalog: &C,
    table: &str,
    excluded_columns: &HashSet<String>,
    options: &ConvertOptions,
    aggregator: &AggregatorHandle,
) -> Result<()> {
    let Some(schema) = introspect_table(catalog, table, excluded_columns).await? else {
        return Ok(());
    };
    let style = options.identifier_style;

    let mut statements = vec![ddl::create_table_statement(&schema, style)];

    for index in &schema.unique_indexes {
        let resolved = aggregator.resolve_index_name(&index.name).await?;
        statements.push(ddl::create_unique_index_statement(
            &resolved,
            &schema.name,
            &index.columns,
            style,
        ));
    }

    statements.extend(dml::build_inserts(catalog, &schema, options.page_size, style).await?);

    aggregator
        .submit(schema.name.clone(), statements.join("\n"))
        .await
}

/// Runs one conversion task per base table under a concurrency limit
pub struct Coordinator<C: Catalog + ?Sized> {
    catalog: Arc<C>,
    options: ConvertOptions,
    ignore: Arc<IgnoreRules>,
    progress: ProgressBar,
}

impl<C: Catalog + ?Sized + 'static> Coordinator<C> {
    pub fn new(catalog: Arc<C>, options: ConvertOptions) -> Self {
        Self {
            catalog,
            options,
            ignore: Arc::new(IgnoreRules::default()),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_ignore_rules(mut self, rules: IgnoreRules) -> Self {
        self.ignore = Arc::new(rules);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    fn settle(&self, joined: Result<Result<()>, JoinError>) -> Result<()> {
        joined
            .context("Table conversion task panicked")
            .and_then(|result| result)?;
        self.progress.inc(1);
        Ok(())
    }

    fn abort(&self, tasks: &mut JoinSet<Result<()>>, error: anyhow::Error) -> anyhow::Error {
        tasks.abort_all();
        self.progress.abandon_with_message("Conversion failed");
        error
    }

    /// Convert every eligible table and wait for all of them
    ///
    /// Views and ignored tables are skipped. The first failing table aborts
    /// the remaining tasks and its error is returned.
    pub async fn run(&self, tables: &[TableInfo]) -> Result<ConversionResults> {
        let eligible: Vec<&TableInfo> = tables
            .iter()
            .filter(|table| match table.kind {
                TableKind::View => {
                    tracing::debug!(
                        "Skipping view '{}': views are not converted",
                        sanitize_identifier(&table.name)
                    );
                    false
                }
                TableKind::BaseTable if self.ignore.is_table_excluded(&table.name) => {
                    tracing::info!("Ignoring table '{}'", sanitize_identifier(&table.name));
                    false
                }
                TableKind::BaseTable => true,
            })
            .collect();

        let concurrency = self.options.concurrency.max(1);
        tracing::info!(
            "Converting {} table(s) with up to {} concurrent tasks",
            eligible.len(),
            concurrency
        );
        self.progress.set_length(eligible.len() as u64);

        let (tx, rx) = mpsc::channel(concurrency * 4);
        let aggregator = tokio::spawn(run_aggregator(rx));
        let handle = AggregatorHandle { tx };

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();

        for table in eligible {
            // Settle finished tasks while waiting for a slot so a failure
            // stops the run before more tables are started.
            let permit = loop {
                let finished = tokio::select! {
                    biased;
                    Some(joined) = tasks.join_next() => joined,
                    permit = semaphore.clone().acquire_owned() => {
                        break permit.context("Concurrency limiter closed unexpectedly")?;
                    }
                };
                if let Err(e) = self.settle(finished) {
                    return Err(self.abort(&mut tasks, e));
                }
            };

            let catalog = Arc::clone(&self.catalog);
            let options = self.options.clone();
            let excluded_columns = self.ignore.excluded_columns(&table.name);
            let aggregator = handle.clone();
            let name = table.name.clone();
            let progress = self.progress.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = convert_table(
                    catalog.as_ref(),
                    &name,
                    &excluded_columns,
                    &options,
                    &aggregator,
                )
                .await
                .with_context(|| format!("Failed to convert table '{}'", name));
                progress.set_message(format!("Converted {}", sanitize_identifier(&name)));
                result
            });
        }
        drop(handle);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = self.settle(joined) {
                return Err(self.abort(&mut tasks, e));
            }
        }

        let results = aggregator
            .await
            .context("Result aggregator task failed")?;

        self.progress.finish_with_message("Conversion complete");
        tracing::info!("Converted {} table(s)", results.len());

        Ok(results)
    }
}
