//! Abstraction over the destination table.
//!
//! The pipeline drives any sink behind this trait: the SQL implementation
//! lives in `chunkload-sql`, and an in-memory mock for tests lives in
//! [`crate::mocks`].

use std::time::Duration;

use async_trait::async_trait;

use crate::batch::RowBatch;
use crate::error::IngestResult;
use crate::schema::TableSchema;

/// Outcome of one batch append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Records written by the append.
    pub rows_written: u64,
    /// Wall-clock duration of the append.
    pub elapsed: Duration,
}

/// Write side of the destination table.
///
/// Implementations must make each `append_batch` its own commit boundary so
/// that a failed run leaves every previously appended batch durable.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Creates (or replaces) the destination table to match `schema`.
    ///
    /// Destructive reset: an existing table of the same name is dropped,
    /// never merged with. Called exactly once per run, strictly before the
    /// first append.
    ///
    /// **Failure:** returns `IngestError::DdlError`; no data has been
    /// written.
    async fn create_table(&self, table: &str, schema: &TableSchema) -> IngestResult<()>;

    /// Appends one normalized batch as a single atomic write.
    ///
    /// **Success:** every record of the batch is committed and the report
    /// carries the count and the wall-clock duration of the write.
    ///
    /// **Failure:** returns `IngestError::WriteError`; nothing from this
    /// batch is committed, batches appended earlier remain.
    async fn append_batch(
        &self,
        table: &str,
        schema: &TableSchema,
        batch: &RowBatch,
    ) -> IngestResult<LoadReport>;
}
