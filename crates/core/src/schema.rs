//! Destination table schema derivation and per-batch validation.

use crate::batch::RowBatch;
use crate::error::{IngestError, IngestResult};
use crate::value::Value;

/// SQL-facing column types supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer column
    Integer,
    /// Double-precision float column
    Float,
    /// Text column
    Text,
    /// Timestamp column
    Timestamp,
}

impl ColumnType {
    /// The type a single value would occupy, if any.
    pub fn of_value(value: &Value) -> Option<ColumnType> {
        match value {
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Text(_) => Some(ColumnType::Text),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
            Value::Null => None,
        }
    }

    /// Whether a value may be stored in a column of this type.
    ///
    /// Nulls are storable anywhere and integers widen into float columns;
    /// every other cross-type pairing is a mismatch.
    pub fn accepts(&self, value: &Value) -> bool {
        match ColumnType::of_value(value) {
            None => true,
            Some(ColumnType::Integer) if *self == ColumnType::Float => true,
            Some(value_type) => value_type == *self,
        }
    }

    /// Lowercase name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp",
        }
    }
}

/// A named, typed column of the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as it appears in the source header.
    pub name: String,
    /// Inferred column type.
    pub column_type: ColumnType,
}

/// The ordered column list defining the destination table's shape.
///
/// Derived once per run from the first normalized batch; later batches are
/// checked against it before they are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    /// Derives a schema from a normalized batch.
    ///
    /// Column order comes from the batch's column list. Each column's type is
    /// the type of the first non-null value found scanning down the batch;
    /// an all-null column defaults to text. Columns in `timestamp_columns`
    /// (by index) are typed as timestamps unconditionally, so an all-null
    /// designated column still produces a timestamp column.
    pub fn infer(batch: &RowBatch, timestamp_columns: &[usize]) -> TableSchema {
        let columns = batch
            .columns()
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let column_type = if timestamp_columns.contains(&index) {
                    ColumnType::Timestamp
                } else {
                    batch
                        .rows()
                        .iter()
                        .find_map(|row| ColumnType::of_value(&row[index]))
                        .unwrap_or(ColumnType::Text)
                };
                Column {
                    name: name.clone(),
                    column_type,
                }
            })
            .collect();
        TableSchema { columns }
    }

    /// Columns in table order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Validates a later batch against this schema.
    ///
    /// The batch must carry the same column names in the same order, and
    /// every value must be storable in its column per
    /// [`ColumnType::accepts`]. Violations fail with
    /// [`IngestError::SchemaMismatch`] naming the batch, record, and column.
    pub fn check_batch(&self, batch: &RowBatch, batch_index: u64) -> IngestResult<()> {
        if batch.columns().len() != self.columns.len() {
            return Err(IngestError::SchemaMismatch(format!(
                "batch {} has {} columns, schema has {}",
                batch_index,
                batch.columns().len(),
                self.columns.len()
            )));
        }
        for (column, name) in self.columns.iter().zip(batch.columns()) {
            if column.name != *name {
                return Err(IngestError::SchemaMismatch(format!(
                    "batch {} column '{}' does not match schema column '{}'",
                    batch_index, name, column.name
                )));
            }
        }
        for (row_index, row) in batch.rows().iter().enumerate() {
            for (column, value) in self.columns.iter().zip(row) {
                if !column.column_type.accepts(value) {
                    return Err(IngestError::SchemaMismatch(format!(
                        "batch {} record {}: column '{}' expects {}, found {}",
                        batch_index,
                        row_index + 1,
                        column.name,
                        column.column_type.name(),
                        value.type_name()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn batch(columns: &[&str], rows: Vec<Vec<Value>>) -> RowBatch {
        let columns = Arc::new(columns.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        RowBatch::new(columns, rows)
    }

    #[test]
    fn test_infer_first_non_null_wins() {
        let batch = batch(
            &["id", "fare", "zone"],
            vec![
                vec![Value::Integer(1), Value::Null, Value::Null],
                vec![Value::Integer(2), Value::Float(9.5), Value::Text("JFK".into())],
            ],
        );
        let schema = TableSchema::infer(&batch, &[]);
        let types: Vec<ColumnType> = schema.columns().iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![ColumnType::Integer, ColumnType::Float, ColumnType::Text]
        );
    }

    #[test]
    fn test_infer_all_null_defaults_to_text() {
        let batch = batch(&["note"], vec![vec![Value::Null], vec![Value::Null]]);
        let schema = TableSchema::infer(&batch, &[]);
        assert_eq!(schema.columns()[0].column_type, ColumnType::Text);
    }

    #[test]
    fn test_infer_timestamp_override() {
        let batch = batch(&["pickup"], vec![vec![Value::Null]]);
        let schema = TableSchema::infer(&batch, &[0]);
        assert_eq!(schema.columns()[0].column_type, ColumnType::Timestamp);
    }

    #[test]
    fn test_check_batch_accepts_compatible_rows() {
        let first = batch(
            &["id", "fare"],
            vec![vec![Value::Integer(1), Value::Float(3.5)]],
        );
        let schema = TableSchema::infer(&first, &[]);
        // Integer widens into the float column, null is storable anywhere.
        let later = batch(
            &["id", "fare"],
            vec![
                vec![Value::Integer(2), Value::Integer(4)],
                vec![Value::Integer(3), Value::Null],
            ],
        );
        assert!(schema.check_batch(&later, 2).is_ok());
    }

    #[test]
    fn test_check_batch_rejects_float_in_integer_column() {
        let first = batch(&["id"], vec![vec![Value::Integer(1)]]);
        let schema = TableSchema::infer(&first, &[]);
        let later = batch(&["id"], vec![vec![Value::Float(2.5)]]);
        let err = schema.check_batch(&later, 2).unwrap_err();
        assert!(matches!(err, IngestError::SchemaMismatch(_)));
        assert!(err.to_string().contains("batch 2"));
    }

    #[test]
    fn test_check_batch_rejects_renamed_column() {
        let first = batch(&["id"], vec![vec![Value::Integer(1)]]);
        let schema = TableSchema::infer(&first, &[]);
        let later = batch(&["identifier"], vec![vec![Value::Integer(2)]]);
        assert!(matches!(
            schema.check_batch(&later, 2),
            Err(IngestError::SchemaMismatch(_))
        ));
    }
}
