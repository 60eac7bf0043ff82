//! Black-box source download, delegated to wget.

use std::path::Path;
use std::process::Command;

use tracing::info;

use chunkload_core::{IngestError, IngestResult};

/// Staged file name for a URL.
///
/// Keeps the `.gz` suffix for compressed sources so the reader's
/// extension-based decompression applies to the staged copy.
pub fn output_name(url: &str) -> &'static str {
    if url.ends_with(".csv.gz") {
        "output.csv.gz"
    } else {
        "output.csv"
    }
}

/// Downloads `url` to `dest`.
///
/// The transport is an external collaborator: wget is invoked as a
/// subprocess and any non-zero exit is a `SourceUnavailable` failure, so
/// the run never starts ingesting a partial download.
pub fn download(url: &str, dest: &Path) -> IngestResult<()> {
    info!("Downloading {} to {}", url, dest.display());
    let status = Command::new("wget")
        .arg("-q")
        .arg(url)
        .arg("-O")
        .arg(dest)
        .status()
        .map_err(|e| IngestError::SourceUnavailable(format!("failed to launch wget: {}", e)))?;

    if !status.success() {
        return Err(IngestError::SourceUnavailable(format!(
            "wget exited with {} for {}",
            status, url
        )));
    }
    Ok(())
}
