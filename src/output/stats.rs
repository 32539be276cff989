//! Statistics gathered from the pipeline's files
//!
//! This module provides a read-only view of how far each stage has got,
//! built from the progress files, the URL list, and the two CSV tables.

use crate::config::Config;
use crate::progress::{ProgressRecord, ProgressStore, Stage};
use crate::storage::{CsvDetailTable, DetailTable, UrlList};
use crate::HarvestError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Listing crawl checkpoint
    pub crawl_progress: ProgressRecord,

    /// Detail fetch checkpoint
    pub detail_progress: ProgressRecord,

    /// Lines in the URL list
    pub urls_listed: u64,

    /// Distinct URLs in the raw detail table
    pub table_rows: u64,

    /// Table rows carrying a listing payload
    pub rows_with_payload: u64,

    /// Listed URLs with no table row yet
    pub urls_pending: u64,

    /// Data rows in the flattened table, if it exists
    pub flattened_rows: Option<u64>,
}

impl HarvestStatistics {
    /// Table rows stored without a payload
    pub fn rows_empty(&self) -> u64 {
        self.table_rows - self.rows_with_payload
    }
}

/// Loads statistics from the configured files
///
/// Missing files count as empty.
pub fn load_statistics(config: &Config) -> Result<HarvestStatistics, HarvestError> {
    let output = &config.output;

    let crawl_progress =
        ProgressStore::new(&output.crawl_progress_path, Stage::ListingCrawl).load();
    let detail_progress =
        ProgressStore::new(&output.detail_progress_path, Stage::DetailFetch).load();

    let urls = UrlList::new(&output.url_list_path).load()?;
    let rows = CsvDetailTable::new(&output.raw_table_path).load_rows()?;

    let in_table: HashSet<&str> = rows.iter().map(|row| row.url.as_str()).collect();
    let urls_pending = urls
        .iter()
        .filter(|url| !in_table.contains(url.as_str()))
        .collect::<HashSet<_>>()
        .len() as u64;

    Ok(HarvestStatistics {
        crawl_progress,
        detail_progress,
        urls_listed: urls.len() as u64,
        table_rows: rows.len() as u64,
        rows_with_payload: rows.iter().filter(|row| row.has_payload()).count() as u64,
        urls_pending,
        flattened_rows: count_flattened_rows(Path::new(&output.flattened_path))?,
    })
}

fn count_flattened_rows(path: &Path) -> Result<Option<u64>, HarvestError> {
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            if let csv::ErrorKind::Io(io) = e.kind() {
                if io.kind() == ErrorKind::NotFound {
                    return Ok(None);
                }
            }
            return Err(e.into());
        }
    };

    let mut count = 0;
    for record in reader.records() {
        record?;
        count += 1;
    }
    Ok(Some(count))
}

fn format_timestamp(record: &ProgressRecord) -> String {
    record
        .updated_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Listing crawl:");
    println!("  Last page: {}", stats.crawl_progress.cursor);
    println!("  URLs collected: {}", stats.crawl_progress.total_completed);
    println!("  URLs in list file: {}", stats.urls_listed);
    println!("  Updated: {}", format_timestamp(&stats.crawl_progress));
    println!();

    println!("Detail fetch:");
    println!("  Last queue index: {}", stats.detail_progress.cursor);
    println!("  Rows stored: {}", stats.detail_progress.total_completed);
    println!("  Updated: {}", format_timestamp(&stats.detail_progress));
    println!();

    println!("Raw table:");
    let payload_rate = if stats.table_rows > 0 {
        (stats.rows_with_payload as f64 / stats.table_rows as f64) * 100.0
    } else {
        0.0
    };
    println!("  Rows: {}", stats.table_rows);
    println!(
        "  With data: {} ({:.1}%)",
        stats.rows_with_payload, payload_rate
    );
    println!("  Empty: {}", stats.rows_empty());
    println!("  URLs not yet fetched: {}", stats.urls_pending);
    println!();

    match stats.flattened_rows {
        Some(rows) => println!("Flattened table: {} rows", rows),
        None => println!("Flattened table: not written yet"),
    }
}
