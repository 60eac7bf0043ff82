//! Run orchestration: the state machine driving one ingestion run.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{IngestError, IngestResult};
use crate::normalize::Normalizer;
use crate::reader::ChunkReader;
use crate::schema::TableSchema;
use crate::sink::{LoadReport, TableSink};

/// Default number of records pulled per batch.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Configuration for one ingestion run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Destination table name.
    pub table: String,
    /// Maximum records per batch.
    pub batch_size: usize,
    /// Source columns coerced to timestamps before loading.
    pub timestamp_columns: Vec<String>,
}

impl RunConfig {
    /// Creates a configuration with the default batch size and no coercions.
    pub fn new(table: impl Into<String>) -> RunConfig {
        RunConfig {
            table: table.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            timestamp_columns: Vec::new(),
        }
    }
}

/// States of an ingestion run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Opening the source and binding coercions
    Start,
    /// Deriving and creating the destination schema from batch 1
    SchemaInit,
    /// Appending batches until the source is exhausted
    Loading,
    /// Run completed, all batches committed
    Done,
    /// Run aborted; batches committed before the failure remain durable
    Failed,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Terminal state reached by the run.
    pub state: RunState,
    /// Batches committed to the sink.
    pub batches_loaded: u64,
    /// Total records committed.
    pub rows_written: u64,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Loaded {} batches ({} rows) in {:.3}s",
            self.batches_loaded,
            self.rows_written,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Callbacks surfacing run progress to the caller.
///
/// The pipeline itself holds no logger; callers attach an observer (tracing,
/// progress bar, test recorder) and receive one event per committed batch
/// plus one terminal event.
pub trait IngestObserver: Send + Sync {
    /// A batch was committed.
    fn on_batch_loaded(&self, _batch_index: u64, _rows_written: u64, _elapsed: Duration) {}

    /// The run reached `Done`.
    fn on_run_completed(&self, _summary: &RunSummary) {}

    /// The run reached `Failed`; counts cover committed batches only.
    fn on_run_failed(&self, _error: &IngestError, _batches_loaded: u64, _rows_written: u64) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl IngestObserver for NoopObserver {}

/// One ingestion run: source open, schema init from batch 1, then the
/// batch-append loop.
///
/// Batches are processed strictly in source order, one at a time; no batch
/// is read ahead while the previous one is being written. The sink is
/// exclusively owned by the run for its duration.
pub struct IngestPipeline<'a> {
    config: RunConfig,
    sink: &'a dyn TableSink,
    observer: &'a dyn IngestObserver,
    state: RunState,
    batches_loaded: u64,
    rows_written: u64,
}

impl<'a> IngestPipeline<'a> {
    /// Creates a pipeline over a sink and an observer.
    pub fn new(
        config: RunConfig,
        sink: &'a dyn TableSink,
        observer: &'a dyn IngestObserver,
    ) -> IngestPipeline<'a> {
        IngestPipeline {
            config,
            sink,
            observer,
            state: RunState::Start,
            batches_loaded: 0,
            rows_written: 0,
        }
    }

    /// State reached by the most recent `run` call.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Executes one run against `source`.
    ///
    /// Any failure aborts the run immediately and surfaces as the error;
    /// batches committed before the failure remain in the table. `Ok` means
    /// the source was fully ingested.
    pub async fn run(&mut self, source: &Path) -> IngestResult<RunSummary> {
        self.state = RunState::Start;
        self.batches_loaded = 0;
        self.rows_written = 0;

        match self.run_inner(source).await {
            Ok(summary) => {
                self.observer.on_run_completed(&summary);
                Ok(summary)
            }
            Err(error) => {
                self.state = RunState::Failed;
                self.observer
                    .on_run_failed(&error, self.batches_loaded, self.rows_written);
                Err(error)
            }
        }
    }

    async fn run_inner(&mut self, source: &Path) -> IngestResult<RunSummary> {
        let started = Instant::now();
        if self.config.table.trim().is_empty() {
            return Err(IngestError::InvalidConfiguration(
                "destination table name is empty".to_string(),
            ));
        }

        let mut reader = ChunkReader::open(source, self.config.batch_size)?;
        let normalizer = Normalizer::bind(&self.config.timestamp_columns, reader.columns())?;

        // Empty source: nothing to derive a schema from, the run is complete
        // without touching the destination table.
        let mut first = match reader.next_batch()? {
            Some(batch) => batch,
            None => {
                self.state = RunState::Done;
                return Ok(self.finish(started));
            }
        };

        self.state = RunState::SchemaInit;
        normalizer.normalize(&mut first, 1)?;
        let schema = TableSchema::infer(&first, &normalizer.target_indexes());
        // The first batch can disagree with its own derived schema (a column
        // starting integer and drifting to float mid-batch). Catch that
        // before the destination table is dropped.
        schema.check_batch(&first, 1)?;
        self.sink.create_table(&self.config.table, &schema).await?;

        let report = self
            .sink
            .append_batch(&self.config.table, &schema, &first)
            .await?;
        drop(first);
        self.note_batch(1, report);
        self.state = RunState::Loading;

        let mut batch_index: u64 = 1;
        while let Some(mut batch) = reader.next_batch()? {
            batch_index += 1;
            normalizer.normalize(&mut batch, batch_index)?;
            schema.check_batch(&batch, batch_index)?;
            let report = self
                .sink
                .append_batch(&self.config.table, &schema, &batch)
                .await?;
            self.note_batch(batch_index, report);
        }

        self.state = RunState::Done;
        Ok(self.finish(started))
    }

    fn note_batch(&mut self, batch_index: u64, report: LoadReport) {
        self.batches_loaded += 1;
        self.rows_written += report.rows_written;
        self.observer
            .on_batch_loaded(batch_index, report.rows_written, report.elapsed);
    }

    fn finish(&self, started: Instant) -> RunSummary {
        RunSummary {
            state: self.state,
            batches_loaded: self.batches_loaded,
            rows_written: self.rows_written,
            elapsed: started.elapsed(),
        }
    }
}
