//! chunkload-sql
//!
//! SQL sink for the ingestion pipeline: connection handling and the
//! Postgres/SQLite table writer behind `chunkload_core::TableSink`.

#![warn(missing_docs)]

/// Connection descriptor and pooled sink connections.
pub mod connection;
/// Destination table writer (DDL and chunked appends).
pub mod writer;

pub use connection::{DatabaseConfig, SinkConnection};
pub use writer::{SqlDialect, SqlTableSink};
