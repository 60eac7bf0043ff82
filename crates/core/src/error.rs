//! Error types for ingestion runs.

use thiserror::Error;

/// Errors that can occur during an ingestion run.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Bad or missing invocation parameter (port, table name, coercion column)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Source file could not be downloaded or opened
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A record or value failed to parse
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A batch diverged from the schema established by the first batch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Destination table could not be created
    #[error("DDL error: {0}")]
    DdlError(String),

    /// A batch append failed
    #[error("Write error: {0}")]
    WriteError(String),

    /// Sink connection could not be established
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;
