//! Row batches: the unit of work moved through the pipeline.

use std::sync::Arc;

use crate::value::Value;

/// An ordered group of records sharing one column list.
///
/// The column list is fixed when the reader opens the source; every batch of
/// a run points at the same list. Rows are stored in source order and values
/// are positional, aligned with the columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<Value>>,
}

impl RowBatch {
    /// Creates a batch over a shared column list.
    pub fn new(columns: Arc<Vec<String>>, rows: Vec<Vec<Value>>) -> RowBatch {
        RowBatch { columns, rows }
    }

    /// Column names, in source header order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in source order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Mutable row access for in-place coercion.
    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
