//! Storage traits and error types
//!
//! This module defines the trait interface for the raw detail table and the
//! associated error type.

use crate::storage::RawDetailRow;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed table {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable table of raw detail rows keyed by URL
///
/// The table doubles as the detail stage's work queue: rows without a
/// payload are pending or failed.
pub trait DetailTable {
    /// Loads every known row in first-seen order, one row per URL
    fn load_rows(&self) -> StorageResult<Vec<RawDetailRow>>;

    /// Durably records the current state of a single row
    ///
    /// Must not return before the row would survive a process exit.
    fn persist_row(&mut self, row: &RawDetailRow) -> StorageResult<()>;
}
