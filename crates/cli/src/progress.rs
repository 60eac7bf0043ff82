//! Progress reporting for interactive ingestion runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use chunkload_core::{IngestError, IngestObserver, RunSummary};

/// Progress bar observer for interactive runs.
///
/// The total row count of a streamed source is unknown up front, so this
/// drives a spinner with a running row counter rather than a bounded bar.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Create a new progress observer.
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {pos} rows | {msg}")
                .expect("Invalid progress template"),
        );
        bar.set_message("Ingesting...");
        ProgressObserver { bar }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestObserver for ProgressObserver {
    fn on_batch_loaded(&self, batch_index: u64, rows_written: u64, elapsed: Duration) {
        self.bar.inc(rows_written);
        self.bar.set_message(format!(
            "batch {} took {:.3}s",
            batch_index,
            elapsed.as_secs_f64()
        ));
    }

    fn on_run_completed(&self, summary: &RunSummary) {
        self.bar.finish_with_message(summary.summary());
    }

    fn on_run_failed(&self, error: &IngestError, _batches_loaded: u64, _rows_written: u64) {
        self.bar.abandon_with_message(format!("failed: {}", error));
    }
}
