//! Append-only list of discovered listing URLs
//!
//! One absolute URL per line, UTF-8, no header.

use crate::storage::{open_line_appender, StorageResult};
use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The URL list file written by the listing crawl
#[derive(Debug, Clone)]
pub struct UrlList {
    path: PathBuf,
}

impl UrlList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all URLs in file order, skipping blank lines
    ///
    /// A missing file is an empty list.
    pub fn load(&self) -> StorageResult<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Reads the file into a set for duplicate checks
    pub fn load_set(&self) -> StorageResult<HashSet<String>> {
        Ok(self.load()?.into_iter().collect())
    }

    /// Appends URLs in order, one per line
    ///
    /// The whole batch goes out in a single write and is synced before
    /// returning. A partial line left by an interrupted earlier append is
    /// cut off first.
    pub fn append(&self, urls: &[String]) -> StorageResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for url in urls {
            buffer.push_str(url);
            buffer.push('\n');
        }

        let mut file = open_line_appender(&self.path)?;
        file.write_all(buffer.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Empties the file (used by fresh crawls)
    pub fn truncate(&self) -> StorageResult<()> {
        std::fs::write(&self.path, "")?;
        Ok(())
    }
}
