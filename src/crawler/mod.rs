//! Crawler module for listing discovery and detail fetching
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Listing-page parsing and detail-page payload extraction
//! - Courtesy pacing and cooperative shutdown
//! - The two resumable stage drivers

mod coordinator;
mod details;
mod extract;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::ListingCrawler;
pub use details::DetailFetcher;
pub use extract::{extract_listing_payload, extract_next_data};
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use parser::{extract_listing_urls, normalize_listing_url, ListingSelectors};
pub use scheduler::{CourtesyDelay, RecordingWait, ShutdownFlag, TokioSleep, WaitPolicy};

use crate::config::Config;
use crate::progress::{ProgressRecord, Stage};
use crate::storage::CsvDetailTable;
use crate::HarvestError;
use std::fmt;

/// How a stage run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// Every remaining unit was visited
    Completed,

    /// The stored cursor was already at the end; nothing was done
    AlreadyComplete,

    /// The shutdown flag stopped the loop between units
    Interrupted,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AlreadyComplete => "already complete",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Summary of one stage run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub stage: Stage,
    pub status: CrawlStatus,

    /// Cursor of the last saved checkpoint
    pub cursor: i64,

    /// Stored running total after this run
    pub total_completed: u64,

    /// Units visited this run
    pub processed: u64,

    /// Units whose fetch or extraction failed this run
    pub failed: u64,

    /// New URLs (listing crawl) or payloads stored (detail fetch) this run
    pub added: u64,
}

impl CrawlOutcome {
    pub(crate) fn start(stage: Stage) -> Self {
        Self {
            stage,
            status: CrawlStatus::Completed,
            cursor: stage.zero_cursor(),
            total_completed: 0,
            processed: 0,
            failed: 0,
            added: 0,
        }
    }

    pub(crate) fn finish(mut self, status: CrawlStatus, record: &ProgressRecord) -> Self {
        self.status = status;
        self.cursor = record.cursor;
        self.total_completed = record.total_completed;
        self
    }

    pub fn is_interrupted(&self) -> bool {
        self.status == CrawlStatus::Interrupted
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: cursor {}, {} total, {} processed this run ({} failed, {} added)",
            self.stage,
            self.status.as_str(),
            self.cursor,
            self.total_completed,
            self.processed,
            self.failed,
            self.added
        )
    }
}

/// Runs the listing crawl with real sleeps
pub async fn run_listing_crawl(
    config: &Config,
    shutdown: &ShutdownFlag,
) -> Result<CrawlOutcome, HarvestError> {
    let crawler = ListingCrawler::new(config, TokioSleep)?;
    crawler.run(shutdown).await
}

/// Runs the detail fetch against the configured CSV table with real sleeps
pub async fn run_detail_fetch(
    config: &Config,
    shutdown: &ShutdownFlag,
) -> Result<CrawlOutcome, HarvestError> {
    let table = CsvDetailTable::new(&config.output.raw_table_path);
    let mut fetcher = DetailFetcher::new(config, table, TokioSleep)?;
    fetcher.run(shutdown).await
}
