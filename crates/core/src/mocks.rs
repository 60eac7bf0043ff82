//! Mock sink implementation for testing.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::batch::RowBatch;
use crate::error::{IngestError, IngestResult};
use crate::schema::TableSchema;
use crate::sink::{LoadReport, TableSink};
use crate::value::Value;

#[derive(Default)]
struct MemorySinkState {
    schema: Option<TableSchema>,
    rows: Vec<Vec<Value>>,
    create_calls: usize,
    append_calls: usize,
}

/// In-memory table sink for testing pipeline behavior.
///
/// Stores appended rows in order and can be configured to fail a specific
/// append, which is how write-failure scenarios are exercised without a
/// database.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
    fail_on_append: Option<usize>,
}

impl MemorySink {
    /// Creates a sink that accepts every write.
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Creates a sink whose `n`-th append attempt (1-based) fails.
    pub fn failing_on_append(n: usize) -> Self {
        MemorySink {
            state: Arc::new(Mutex::new(MemorySinkState::default())),
            fail_on_append: Some(n),
        }
    }

    /// Schema from the most recent `create_table` call.
    pub fn schema(&self) -> Option<TableSchema> {
        self.state.lock().unwrap().schema.clone()
    }

    /// All committed rows, in append order.
    pub fn rows(&self) -> Vec<Vec<Value>> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Number of committed rows.
    pub fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    /// Number of `create_table` calls.
    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    /// Number of append attempts, failed ones included.
    pub fn append_calls(&self) -> usize {
        self.state.lock().unwrap().append_calls
    }
}

#[async_trait::async_trait]
impl TableSink for MemorySink {
    async fn create_table(&self, _table: &str, schema: &TableSchema) -> IngestResult<()> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        // Destructive replace, like the SQL sink's drop-and-recreate.
        state.schema = Some(schema.clone());
        state.rows.clear();
        Ok(())
    }

    async fn append_batch(
        &self,
        _table: &str,
        _schema: &TableSchema,
        batch: &RowBatch,
    ) -> IngestResult<LoadReport> {
        let started = Instant::now();
        let mut state = self.state.lock().unwrap();
        state.append_calls += 1;
        if self.fail_on_append == Some(state.append_calls) {
            return Err(IngestError::WriteError(format!(
                "injected failure on append {}",
                state.append_calls
            )));
        }
        state.rows.extend(batch.rows().iter().cloned());
        Ok(LoadReport {
            rows_written: batch.len() as u64,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> RowBatch {
        RowBatch::new(
            Arc::new(vec!["id".to_string()]),
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        )
    }

    #[tokio::test]
    async fn test_memory_sink_records_appends() {
        let sink = MemorySink::new();
        let batch = sample_batch();
        let schema = TableSchema::infer(&batch, &[]);
        sink.create_table("t", &schema).await.unwrap();
        let report = sink.append_batch("t", &schema, &batch).await.unwrap();
        assert_eq!(report.rows_written, 2);
        assert_eq!(sink.row_count(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_create_table_is_destructive() {
        let sink = MemorySink::new();
        let batch = sample_batch();
        let schema = TableSchema::infer(&batch, &[]);
        sink.create_table("t", &schema).await.unwrap();
        sink.append_batch("t", &schema, &batch).await.unwrap();
        sink.create_table("t", &schema).await.unwrap();
        assert_eq!(sink.row_count(), 0);
        assert_eq!(sink.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_memory_sink_injected_failure() {
        let sink = MemorySink::failing_on_append(1);
        let batch = sample_batch();
        let schema = TableSchema::infer(&batch, &[]);
        sink.create_table("t", &schema).await.unwrap();
        let err = sink.append_batch("t", &schema, &batch).await.unwrap_err();
        assert!(matches!(err, IngestError::WriteError(_)));
        assert_eq!(sink.row_count(), 0);
    }
}
