//! Structured logging and counters for ingestion runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use chunkload_core::{IngestError, IngestObserver, RunSummary};

static BATCHES_LOADED_TOTAL: AtomicU64 = AtomicU64::new(0);
static ROWS_WRITTEN_TOTAL: AtomicU64 = AtomicU64::new(0);
static RUNS_FAILED_TOTAL: AtomicU64 = AtomicU64::new(0);

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Records one committed batch as a structured log entry.
pub fn record_batch_loaded(table: &str, batch_index: u64, rows_written: u64, elapsed: Duration) {
    let batches_total = BATCHES_LOADED_TOTAL.fetch_add(1, Ordering::Relaxed) + 1;
    let rows_total = ROWS_WRITTEN_TOTAL.fetch_add(rows_written, Ordering::Relaxed) + rows_written;
    info!(
        metric = "batch_load_latency_ms",
        table,
        batch = batch_index,
        rows = rows_written,
        latency_ms = duration_ms(elapsed),
        batches_loaded_total = batches_total,
        rows_written_total = rows_total
    );
}

/// Records run completion with its final counts.
pub fn record_run_completed(table: &str, summary: &RunSummary) {
    info!(
        metric = "run_completed",
        table,
        batches = summary.batches_loaded,
        rows = summary.rows_written,
        elapsed_ms = duration_ms(summary.elapsed)
    );
}

/// Marks a failed run, keeping the committed-batch trail in the log.
pub fn record_run_failed(table: &str, error: &str, batches_loaded: u64, rows_written: u64) {
    let total = RUNS_FAILED_TOTAL.fetch_add(1, Ordering::Relaxed) + 1;
    warn!(
        metric = "run_failed",
        table,
        error,
        batches_loaded,
        rows_written,
        runs_failed_total = total
    );
}

/// Observer translating pipeline events into the structured log entries
/// above.
pub struct TracingObserver {
    table: String,
}

impl TracingObserver {
    /// Creates an observer labelling entries with the destination table.
    pub fn new(table: impl Into<String>) -> TracingObserver {
        TracingObserver {
            table: table.into(),
        }
    }
}

impl IngestObserver for TracingObserver {
    fn on_batch_loaded(&self, batch_index: u64, rows_written: u64, elapsed: Duration) {
        record_batch_loaded(&self.table, batch_index, rows_written, elapsed);
    }

    fn on_run_completed(&self, summary: &RunSummary) {
        record_run_completed(&self.table, summary);
    }

    fn on_run_failed(&self, error: &IngestError, batches_loaded: u64, rows_written: u64) {
        record_run_failed(&self.table, &error.to_string(), batches_loaded, rows_written);
    }
}
