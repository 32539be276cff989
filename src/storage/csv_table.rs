//! CSV implementation of the raw detail table
//!
//! The file has a `url,raw_json` header. Rows are appended as they are
//! processed; when a URL appears more than once the row keeps its first
//! position and the latest non-empty payload. A payload that is not valid
//! JSON is read back as pending.

use crate::storage::traits::{DetailTable, StorageError, StorageResult};
use crate::storage::{open_line_appender, RawDetailRow};
use serde::de::IgnoredAny;
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Column headers of the raw detail table
pub const RAW_TABLE_HEADERS: [&str; 2] = ["url", "raw_json"];

/// CSV-file-backed detail table
#[derive(Debug, Clone)]
pub struct CsvDetailTable {
    path: PathBuf,
}

impl CsvDetailTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the table file (used by fresh detail runs)
    pub fn clear(&self) -> StorageResult<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> StorageError {
        StorageError::Malformed {
            path: self.path.display().to_string(),
            message: message.into(),
        }
    }
}

impl DetailTable for CsvDetailTable {
    fn load_rows(&self) -> StorageResult<Vec<RawDetailRow>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        if !headers.is_empty() && headers.get(0) != Some(RAW_TABLE_HEADERS[0]) {
            return Err(self.malformed(format!(
                "expected first column '{}', found {:?}",
                RAW_TABLE_HEADERS[0],
                headers.get(0)
            )));
        }

        let mut rows: Vec<RawDetailRow> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (line, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        "Skipping unreadable row {} in {}: {}",
                        line + 1,
                        self.path.display(),
                        e
                    );
                    continue;
                }
            };

            let url = record.get(0).unwrap_or("").trim();
            if url.is_empty() {
                continue;
            }
            let raw_json = match record.get(1).filter(|value| !value.is_empty()) {
                Some(value) if serde_json::from_str::<IgnoredAny>(value).is_ok() => {
                    Some(value.to_string())
                }
                Some(_) => {
                    tracing::warn!(
                        "Row for {} has an unreadable payload, treating as pending",
                        url
                    );
                    None
                }
                None => None,
            };

            match positions.get(url) {
                Some(&index) => {
                    if raw_json.is_some() {
                        rows[index].raw_json = raw_json;
                    }
                }
                None => {
                    positions.insert(url.to_string(), rows.len());
                    rows.push(RawDetailRow {
                        url: url.to_string(),
                        raw_json,
                    });
                }
            }
        }

        Ok(rows)
    }

    fn persist_row(&mut self, row: &RawDetailRow) -> StorageResult<()> {
        let mut file = open_line_appender(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        // Encode first so the row reaches the file in one write
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        if needs_header {
            writer.write_record(RAW_TABLE_HEADERS)?;
        }
        writer.write_record([row.url.as_str(), row.raw_json.as_deref().unwrap_or("")])?;

        let encoded = writer
            .into_inner()
            .map_err(|e| StorageError::Io(e.into_error()))?;
        file.write_all(&encoded)?;
        file.sync_data()?;
        Ok(())
    }
}
