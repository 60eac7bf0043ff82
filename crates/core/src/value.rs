//! Scalar values carried by row batches.

use chrono::NaiveDateTime;

/// A single typed cell in a row batch.
///
/// Raw CSV fields start out as `Text`, `Integer`, `Float`, or `Null`;
/// `Timestamp` values are produced by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 text
    Text(String),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Timestamp without timezone
    Timestamp(NaiveDateTime),
    /// Missing value (empty CSV field or SQL NULL)
    Null,
}

impl Value {
    /// Types a raw CSV field.
    ///
    /// Empty fields become `Null`; fields that parse as integers or floats
    /// become numeric; everything else stays text. Timestamps are not
    /// recognized here, only by the normalizer's designated columns.
    pub fn from_field(field: &str) -> Value {
        if field.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = field.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = field.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Text(field.to_string())
    }

    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "null",
        }
    }
}
