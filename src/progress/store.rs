//! File-backed progress store
//!
//! Records are written as pretty JSON through a temporary sibling file that is
//! renamed over the target, so a reader only ever sees a complete record.

use crate::progress::{ProgressRecord, Stage};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Durable progress record for one pipeline stage
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
    stage: Stage,
}

impl ProgressStore {
    /// Creates a store for `stage` persisted at `path`
    pub fn new(path: impl Into<PathBuf>, stage: Stage) -> Self {
        Self {
            path: path.into(),
            stage,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored record
    ///
    /// A missing, unreadable, or corrupt file yields the stage's zero record.
    pub fn load(&self) -> ProgressRecord {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return ProgressRecord::zero(self.stage);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read {} progress from {}: {}; starting from the beginning",
                    self.stage,
                    self.path.display(),
                    e
                );
                return ProgressRecord::zero(self.stage);
            }
        };

        match serde_json::from_str::<ProgressRecord>(&content) {
            Ok(record) if record.cursor >= self.stage.zero_cursor() => record,
            Ok(record) => {
                tracing::warn!(
                    "Ignoring {} progress with invalid cursor {}",
                    self.stage,
                    record.cursor
                );
                ProgressRecord::zero(self.stage)
            }
            Err(e) => {
                tracing::warn!(
                    "Corrupt {} progress file {}: {}; starting from the beginning",
                    self.stage,
                    self.path.display(),
                    e
                );
                ProgressRecord::zero(self.stage)
            }
        }
    }

    /// Stamps and persists the record
    ///
    /// Failures are logged and reported as `false`; they never abort the run.
    pub fn save(&self, record: &mut ProgressRecord) -> bool {
        record.updated_at = Some(Utc::now());

        match self.write_atomically(record) {
            Ok(()) => {
                tracing::trace!(
                    "Saved {} progress: cursor={} total={}",
                    self.stage,
                    record.cursor,
                    record.total_completed
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to save {} progress to {}: {}",
                    self.stage,
                    self.path.display(),
                    e
                );
                false
            }
        }
    }

    /// Deletes the stored record so the next load starts from zero
    pub fn reset(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn write_atomically(&self, record: &ProgressRecord) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
