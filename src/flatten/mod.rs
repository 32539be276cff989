//! Flattening of raw listing payloads into a fixed-schema table
//!
//! The flattener is a pure transform over the raw detail table. It is re-run
//! wholesale each time and never touches its input.

pub mod json_path;
mod row;

pub use row::{FlatRow, FLAT_COLUMNS};

use crate::config::Config;
use crate::storage::{CsvDetailTable, DetailTable, RawDetailRow};
use crate::HarvestError;
use serde_json::Value;
use std::path::Path;

/// Counts from one flatten run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenSummary {
    /// Rows written to the flattened table
    pub rows: usize,

    /// Rows whose payload was missing or unparseable
    pub empty: usize,
}

/// Flattens one raw row
///
/// An absent payload or unparseable JSON yields a row with only the URL set.
pub fn flatten_row(row: &RawDetailRow) -> FlatRow {
    let Some(raw) = row.raw_json.as_deref() else {
        return FlatRow::empty(&row.url);
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(listing) => FlatRow::from_listing(&row.url, &listing),
        Err(e) => {
            tracing::warn!("Unparseable payload for {}: {}", row.url, e);
            FlatRow::empty(&row.url)
        }
    }
}

/// Flattens every raw row, preserving order
pub fn flatten_rows(rows: &[RawDetailRow]) -> Vec<FlatRow> {
    rows.iter().map(flatten_row).collect()
}

/// Writes flattened rows as a headered CSV, replacing any existing file
///
/// The header is always written, so an empty `rows` still yields a valid
/// table.
///
/// # Arguments
///
/// * `path` - Destination of the flattened table
/// * `rows` - Rows in output order
///
/// # Returns
///
/// * `Ok(())` - The file was written and flushed
/// * `Err(HarvestError)` - The file could not be created or written
pub fn write_flat_rows(path: &Path, rows: &[FlatRow]) -> Result<(), HarvestError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(FLAT_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the raw detail table and rewrites the flattened table
///
/// # Arguments
///
/// * `config` - Configuration naming the raw and flattened table paths
///
/// # Returns
///
/// * `Ok(FlattenSummary)` - Row counts of the table just written
/// * `Err(HarvestError)` - The raw table is malformed or the output could not
///   be written
pub fn run_flatten(config: &Config) -> Result<FlattenSummary, HarvestError> {
    let table = CsvDetailTable::new(&config.output.raw_table_path);
    let raw_rows = table.load_rows()?;
    let flat_rows = flatten_rows(&raw_rows);

    let summary = FlattenSummary {
        rows: flat_rows.len(),
        empty: flat_rows.iter().filter(|row| row.is_empty()).count(),
    };

    write_flat_rows(Path::new(&config.output.flattened_path), &flat_rows)?;

    tracing::info!(
        "Flattened {} rows ({} without data) into {}",
        summary.rows,
        summary.empty,
        config.output.flattened_path
    );

    Ok(summary)
}
