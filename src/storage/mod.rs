//! Storage module for persisting harvest data
//!
//! This module handles the files the pipeline writes, including:
//! - The append-only URL list produced by the listing crawl
//! - The raw detail table (`url,raw_json`) produced by the detail fetch

mod csv_table;
mod traits;
mod url_list;

pub use csv_table::{CsvDetailTable, RAW_TABLE_HEADERS};
pub use traits::{DetailTable, StorageError, StorageResult};
pub use url_list::UrlList;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Read size when scanning backwards for the last newline
const TAIL_CHUNK: u64 = 8192;

/// One row of the raw detail table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDetailRow {
    /// Listing detail-page URL (the row key)
    pub url: String,

    /// Serialized listing JSON, absent when pending or when extraction failed
    pub raw_json: Option<String>,
}

impl RawDetailRow {
    /// A row awaiting its fetch
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            raw_json: None,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.raw_json.is_some()
    }
}

/// Opens a line-oriented file positioned for appending whole lines
///
/// Bytes after the last newline belong to a write that was cut short and
/// never checkpointed, so they are truncated before anything is appended.
pub(crate) fn open_line_appender(path: &Path) -> std::io::Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(path)?;

    let len = file.metadata()?.len();
    let committed = committed_len(&mut file, len)?;
    if committed < len {
        tracing::warn!(
            "Dropping {} bytes of unterminated data at the end of {}",
            len - committed,
            path.display()
        );
        file.set_len(committed)?;
    }

    file.seek(SeekFrom::Start(committed))?;
    Ok(file)
}

/// Length of the file up to and including its last newline
fn committed_len(file: &mut File, len: u64) -> std::io::Result<u64> {
    let mut buffer = vec![0u8; TAIL_CHUNK as usize];
    let mut end = len;

    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK);
        let size = (end - start) as usize;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buffer[..size])?;

        if let Some(pos) = buffer[..size].iter().rposition(|&b| b == b'\n') {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }

    Ok(0)
}
