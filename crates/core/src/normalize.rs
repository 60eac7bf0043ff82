//! Per-column type coercion applied to each batch before it is written.

use chrono::NaiveDateTime;

use crate::batch::RowBatch;
use crate::error::{IngestError, IngestResult};
use crate::value::Value;

/// Textual timestamp format used by the source files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Coerces designated text columns into timestamps, in place.
///
/// Strict mode: a value that does not parse fails the whole batch, and the
/// run with it. Nulls pass through untouched.
#[derive(Debug)]
pub struct Normalizer {
    targets: Vec<(usize, String)>,
}

impl Normalizer {
    /// Resolves designated column names against the source header.
    ///
    /// Fails with `InvalidConfiguration` when a designated column is absent
    /// from the header, so a misconfigured run stops before any data moves.
    pub fn bind(timestamp_columns: &[String], header: &[String]) -> IngestResult<Normalizer> {
        let mut targets = Vec::with_capacity(timestamp_columns.len());
        for name in timestamp_columns {
            let index = header.iter().position(|column| column == name).ok_or_else(|| {
                IngestError::InvalidConfiguration(format!(
                    "timestamp column '{}' not found in source header",
                    name
                ))
            })?;
            targets.push((index, name.clone()));
        }
        Ok(Normalizer { targets })
    }

    /// Indexes of the designated columns, for schema derivation.
    pub fn target_indexes(&self) -> Vec<usize> {
        self.targets.iter().map(|(index, _)| *index).collect()
    }

    /// Coerces the designated columns of one batch.
    ///
    /// `batch_index` is carried into error messages so a failed run names
    /// the batch that broke it.
    pub fn normalize(&self, batch: &mut RowBatch, batch_index: u64) -> IngestResult<()> {
        for (row_index, row) in batch.rows_mut().iter_mut().enumerate() {
            for (column_index, column_name) in &self.targets {
                let value = &mut row[*column_index];
                match value {
                    Value::Text(text) => {
                        let parsed = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
                            .map_err(|e| {
                                IngestError::ParseError(format!(
                                    "batch {} record {}: column '{}' value '{}' is not a timestamp: {}",
                                    batch_index,
                                    row_index + 1,
                                    column_name,
                                    text,
                                    e
                                ))
                            })?;
                        *value = Value::Timestamp(parsed);
                    }
                    Value::Null => {}
                    other => {
                        return Err(IngestError::ParseError(format!(
                            "batch {} record {}: column '{}' expects a textual timestamp, found {}",
                            batch_index,
                            row_index + 1,
                            column_name,
                            other.type_name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn batch(rows: Vec<Vec<Value>>) -> RowBatch {
        RowBatch::new(
            Arc::new(vec!["pickup".to_string(), "fare".to_string()]),
            rows,
        )
    }

    fn header() -> Vec<String> {
        vec!["pickup".to_string(), "fare".to_string()]
    }

    #[test]
    fn test_normalize_parses_designated_column() {
        let normalizer = Normalizer::bind(&["pickup".to_string()], &header()).unwrap();
        let mut batch = batch(vec![vec![
            Value::Text("2021-01-15 08:30:00".to_string()),
            Value::Float(9.5),
        ]]);
        normalizer.normalize(&mut batch, 1).unwrap();

        let expected = NaiveDate::from_ymd_opt(2021, 1, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(batch.rows()[0][0], Value::Timestamp(expected));
        // Non-designated column untouched.
        assert_eq!(batch.rows()[0][1], Value::Float(9.5));
    }

    #[test]
    fn test_normalize_null_passes_through() {
        let normalizer = Normalizer::bind(&["pickup".to_string()], &header()).unwrap();
        let mut batch = batch(vec![vec![Value::Null, Value::Null]]);
        normalizer.normalize(&mut batch, 1).unwrap();
        assert_eq!(batch.rows()[0][0], Value::Null);
    }

    #[test]
    fn test_normalize_rejects_malformed_value() {
        let normalizer = Normalizer::bind(&["pickup".to_string()], &header()).unwrap();
        let mut batch = batch(vec![vec![Value::Text("not-a-date".to_string()), Value::Null]]);
        let err = normalizer.normalize(&mut batch, 3).unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));
        assert!(err.to_string().contains("batch 3"));
        assert!(err.to_string().contains("not-a-date"));
    }

    #[test]
    fn test_normalize_rejects_numeric_value_in_designated_column() {
        let normalizer = Normalizer::bind(&["pickup".to_string()], &header()).unwrap();
        let mut batch = batch(vec![vec![Value::Integer(20210115), Value::Null]]);
        assert!(matches!(
            normalizer.normalize(&mut batch, 1),
            Err(IngestError::ParseError(_))
        ));
    }

    #[test]
    fn test_bind_rejects_unknown_column() {
        let err = Normalizer::bind(&["dropoff".to_string()], &header()).unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("dropoff"));
    }
}
