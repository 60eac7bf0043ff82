//! chunkload-core
//!
//! Core of the chunked CSV ingestion pipeline: bounded batch reading,
//! column coercion, schema derivation, and the run orchestrator.

#![warn(missing_docs)]

mod batch;
mod error;
pub mod mocks;
mod normalize;
mod pipeline;
mod reader;
mod schema;
mod sink;
mod value;

pub use batch::RowBatch;
pub use error::{IngestError, IngestResult};
pub use normalize::{Normalizer, TIMESTAMP_FORMAT};
pub use pipeline::{
    IngestObserver, IngestPipeline, NoopObserver, RunConfig, RunState, RunSummary,
    DEFAULT_BATCH_SIZE,
};
pub use reader::{ChunkReader, Compression};
pub use schema::{Column, ColumnType, TableSchema};
pub use sink::{LoadReport, TableSink};
pub use value::Value;
