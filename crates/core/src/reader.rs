//! Streaming chunk reader over delimited source files.
//!
//! The reader pulls bounded batches out of a CSV file (plain or gzip) without
//! ever materializing the whole file: memory stays proportional to the batch
//! size regardless of source size.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;

use crate::batch::RowBatch;
use crate::error::{IngestError, IngestResult};
use crate::value::Value;

/// Source compression, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Gzip-compressed source (`.gz` extension)
    Gzip,
    /// Uncompressed source
    None,
}

impl Compression {
    /// Detects compression from the path's extension, not its content.
    pub fn detect(path: &Path) -> Compression {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Compression::Gzip,
            _ => Compression::None,
        }
    }
}

/// Lazy, forward-only reader producing row batches of a fixed maximum size.
///
/// Restartable only by reopening: once exhausted, a reader stays exhausted.
/// End of input is signalled by `Ok(None)`, never by an error.
pub struct ChunkReader {
    records: csv::StringRecordsIntoIter<Box<dyn Read + Send>>,
    columns: Arc<Vec<String>>,
    batch_size: usize,
    records_read: u64,
}

impl ChunkReader {
    /// Opens a source file and reads its header.
    ///
    /// A `.gz` extension selects transparent gzip decompression. Fails with
    /// `InvalidConfiguration` for a zero batch size and `SourceUnavailable`
    /// when the file cannot be opened or its header cannot be read.
    pub fn open(path: &Path, batch_size: usize) -> IngestResult<ChunkReader> {
        if batch_size == 0 {
            return Err(IngestError::InvalidConfiguration(
                "batch size must be at least 1".to_string(),
            ));
        }

        let file = File::open(path).map_err(|e| {
            IngestError::SourceUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        let raw: Box<dyn Read + Send> = match Compression::detect(path) {
            Compression::Gzip => Box::new(MultiGzDecoder::new(file)),
            Compression::None => Box::new(file),
        };

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(raw);
        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| {
                IngestError::SourceUnavailable(format!(
                    "cannot read header of {}: {}",
                    path.display(),
                    e
                ))
            })?
            .iter()
            .map(|name| name.to_string())
            .collect();

        Ok(ChunkReader {
            records: reader.into_records(),
            columns: Arc::new(columns),
            batch_size,
            records_read: 0,
        })
    }

    /// Column names from the source header, in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Pulls the next batch of up to `batch_size` records.
    ///
    /// Returns `Ok(None)` once the source is exhausted. A malformed record
    /// (unreadable or with a field count differing from the header) fails
    /// with `ParseError`.
    pub fn next_batch(&mut self) -> IngestResult<Option<RowBatch>> {
        let mut rows = Vec::new();
        while rows.len() < self.batch_size {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    return Err(IngestError::ParseError(format!(
                        "record {}: {}",
                        self.records_read + 1,
                        e
                    )));
                }
                None => break,
            };
            self.records_read += 1;
            rows.push(record.iter().map(Value::from_field).collect());
        }

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(RowBatch::new(Arc::clone(&self.columns), rows)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_detect_compression_by_extension() {
        assert_eq!(
            Compression::detect(Path::new("data/output.csv.gz")),
            Compression::Gzip
        );
        assert_eq!(
            Compression::detect(Path::new("data/output.csv")),
            Compression::None
        );
    }

    #[test]
    fn test_batches_preserve_order_and_size() {
        let file = write_csv(&[
            "id,zone", "1,a", "2,b", "3,c", "4,d", "5,e", "6,f", "7,g", "8,h", "9,i", "10,j",
        ]);
        let mut reader = ChunkReader::open(file.path(), 4).unwrap();
        assert_eq!(reader.columns(), ["id", "zone"]);

        let mut seen = Vec::new();
        let mut sizes = Vec::new();
        while let Some(batch) = reader.next_batch().unwrap() {
            sizes.push(batch.len());
            for row in batch.rows() {
                seen.push(row[0].clone());
            }
        }
        assert_eq!(sizes, vec![4, 4, 2]);
        let expected: Vec<Value> = (1..=10).map(Value::Integer).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_exhaustion_is_not_an_error() {
        let file = write_csv(&["id", "1"]);
        let mut reader = ChunkReader::open(file.path(), 10).unwrap();
        assert!(reader.next_batch().unwrap().is_some());
        assert!(reader.next_batch().unwrap().is_none());
        // Stays exhausted on repeated pulls.
        assert!(reader.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_header_only_source_is_empty() {
        let file = write_csv(&["id,zone"]);
        let mut reader = ChunkReader::open(file.path(), 10).unwrap();
        assert!(reader.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_gzip_source_reads_transparently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv.gz");
        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        writeln!(encoder, "id,zone").unwrap();
        writeln!(encoder, "1,a").unwrap();
        writeln!(encoder, "2,b").unwrap();
        encoder.finish().unwrap();

        let mut reader = ChunkReader::open(&path, 100).unwrap();
        let batch = reader.next_batch().unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.rows()[1][1], Value::Text("b".to_string()));
        assert!(reader.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let file = write_csv(&["id", "1"]);
        assert!(matches!(
            ChunkReader::open(file.path(), 0),
            Err(IngestError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        assert!(matches!(
            ChunkReader::open(Path::new("/no/such/file.csv"), 10),
            Err(IngestError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_ragged_record_is_parse_error() {
        let file = write_csv(&["id,zone", "1,a", "2"]);
        let mut reader = ChunkReader::open(file.path(), 10).unwrap();
        let err = reader.next_batch().unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));
    }
}
