use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use chunkload_core::{IngestError, IngestObserver, IngestPipeline, RunConfig};
use chunkload_observability::TracingObserver;
use chunkload_sql::{SinkConnection, SqlTableSink};

use crate::progress::ProgressObserver;

pub mod fetch;
pub mod progress;

pub use chunkload_core::RunSummary;

/// Configuration for running the `chunkload ingest` command.
pub struct IngestConfig {
    /// Sink DSN (postgres://… or sqlite:…)
    pub dsn: String,
    /// Destination table name
    pub table: String,
    /// Source URL (fetched via wget) or local file path
    pub source: String,
    /// Maximum records per batch
    pub batch_size: usize,
    /// Source columns coerced to timestamps
    pub timestamp_columns: Vec<String>,
    /// Show an interactive progress bar
    pub progress: bool,
}

/// Executes the ingestion workflow end-to-end.
///
/// Remote sources are staged into a temporary directory first; the staged
/// file keeps its `.gz` suffix so decompression stays extension-driven.
/// The sink connection is released on both success and failure.
pub async fn run_ingest(config: IngestConfig) -> Result<RunSummary> {
    let staging = tempfile::tempdir().context("unable to create staging directory")?;
    let source = stage_source(&config.source, staging.path())?;

    let sink = SqlTableSink::new(SinkConnection::connect(&config.dsn).await?);

    let mut observers: Vec<Box<dyn IngestObserver>> =
        vec![Box::new(TracingObserver::new(config.table.clone()))];
    if config.progress {
        observers.push(Box::new(ProgressObserver::new()));
    }
    let observer = ObserverStack { observers };

    let run_config = RunConfig {
        table: config.table.clone(),
        batch_size: config.batch_size,
        timestamp_columns: config.timestamp_columns.clone(),
    };
    let mut pipeline = IngestPipeline::new(run_config, &sink, &observer);
    let result = pipeline.run(&source).await;
    sink.connection().close().await;

    result.with_context(|| format!("ingestion into '{}' failed", config.table))
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn stage_source(source: &str, staging: &Path) -> Result<PathBuf> {
    if is_remote(source) {
        let dest = staging.join(fetch::output_name(source));
        fetch::download(source, &dest)?;
        Ok(dest)
    } else {
        Ok(PathBuf::from(source))
    }
}

/// Fans pipeline events out to every attached observer.
struct ObserverStack {
    observers: Vec<Box<dyn IngestObserver>>,
}

impl IngestObserver for ObserverStack {
    fn on_batch_loaded(&self, batch_index: u64, rows_written: u64, elapsed: Duration) {
        for observer in &self.observers {
            observer.on_batch_loaded(batch_index, rows_written, elapsed);
        }
    }

    fn on_run_completed(&self, summary: &RunSummary) {
        for observer in &self.observers {
            observer.on_run_completed(summary);
        }
    }

    fn on_run_failed(&self, error: &IngestError, batches_loaded: u64, rows_written: u64) {
        for observer in &self.observers {
            observer.on_run_failed(error, batches_loaded, rows_written);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://host/data.csv.gz"));
        assert!(is_remote("http://host/data.csv"));
        assert!(!is_remote("/var/data/trips.csv"));
        assert!(!is_remote("trips.csv"));
    }

    #[test]
    fn test_stage_source_passes_local_paths_through() {
        let staging = tempfile::tempdir().unwrap();
        let staged = stage_source("/var/data/trips.csv", staging.path()).unwrap();
        assert_eq!(staged, PathBuf::from("/var/data/trips.csv"));
    }
}
