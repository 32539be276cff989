//! Detail fetch driver
//!
//! Visits each discovered listing URL once, extracts the embedded listing
//! payload, and appends one `url,raw_json` row per URL to the detail table.

use crate::config::Config;
use crate::crawler::extract::extract_listing_payload;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::scheduler::{CourtesyDelay, ShutdownFlag, WaitPolicy};
use crate::crawler::{CrawlOutcome, CrawlStatus};
use crate::progress::{ProgressStore, Stage};
use crate::storage::{DetailTable, RawDetailRow, UrlList};
use crate::HarvestError;
use std::collections::HashSet;

/// Drives the per-URL detail fetch over a `DetailTable`
pub struct DetailFetcher<T, W> {
    fetcher: Fetcher<W>,
    wait: W,
    pause: CourtesyDelay,
    table: T,
    url_list: UrlList,
    progress: ProgressStore,
}

impl<T: DetailTable, W: WaitPolicy + Clone> DetailFetcher<T, W> {
    pub fn new(config: &Config, table: T, wait: W) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::new(&config.fetcher, wait.clone())?;
        Ok(Self {
            fetcher,
            wait,
            pause: CourtesyDelay::fixed_ms(config.delays.detail_pause_ms),
            table,
            url_list: UrlList::new(&config.output.url_list_path),
            progress: ProgressStore::new(&config.output.detail_progress_path, Stage::DetailFetch),
        })
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn progress_store(&self) -> &ProgressStore {
        &self.progress
    }

    /// Builds the work queue
    ///
    /// Rows already in the table come first, in table order. URL-list
    /// entries the table does not know yet follow as pending rows, in
    /// URL-list order. Both the table and the URL list only grow, so the
    /// queue prefix stays stable across runs.
    pub fn build_queue(&self) -> Result<Vec<RawDetailRow>, HarvestError> {
        let mut queue = self.table.load_rows()?;
        let mut known: HashSet<String> = queue.iter().map(|row| row.url.clone()).collect();

        for url in self.url_list.load()? {
            if known.insert(url.clone()) {
                queue.push(RawDetailRow::pending(url));
            }
        }

        Ok(queue)
    }

    /// Runs the detail fetch from the unit after the stored cursor
    ///
    /// Each visited URL is persisted right after its fetch, with an empty
    /// payload when the fetch or extraction failed; such rows are not
    /// retried once the cursor has passed them. Rows that already carry a
    /// payload are skipped without a request.
    pub async fn run(&mut self, shutdown: &ShutdownFlag) -> Result<CrawlOutcome, HarvestError> {
        let queue = self.build_queue()?;
        let mut record = self.progress.load();
        let mut outcome = CrawlOutcome::start(Stage::DetailFetch);

        let start = usize::try_from(record.next_unit()).unwrap_or(0);
        if start >= queue.len() {
            tracing::info!(
                "All {} queued URLs already processed ({} rows stored)",
                queue.len(),
                record.total_completed
            );
            return Ok(outcome.finish(CrawlStatus::AlreadyComplete, &record));
        }

        tracing::info!(
            "Fetching details for {} of {} queued URLs",
            queue.len() - start,
            queue.len()
        );

        // Cleared by the first failed persist; later rows are still written
        // but the checkpoint stays behind the gap.
        let mut checkpointing = true;
        let last = queue.len() - 1;

        for (index, row) in queue.iter().enumerate().skip(start) {
            if shutdown.is_triggered() {
                tracing::warn!("Stopping before {} ({}/{})", row.url, index + 1, queue.len());
                self.progress.save(&mut record);
                return Ok(outcome.finish(CrawlStatus::Interrupted, &record));
            }

            let unit = index as i64;

            if row.has_payload() {
                tracing::debug!("Already stored: {}", row.url);
                if checkpointing {
                    record.complete(unit, 0);
                }
                continue;
            }

            outcome.processed += 1;
            let raw_json = self.fetch_payload(&row.url).await;
            if raw_json.is_some() {
                outcome.added += 1;
            } else {
                outcome.failed += 1;
            }

            let stored = RawDetailRow {
                url: row.url.clone(),
                raw_json,
            };

            match self.table.persist_row(&stored) {
                Ok(()) if checkpointing => {
                    record.complete(unit, 1);
                    self.progress.save(&mut record);
                }
                Ok(()) => {
                    tracing::debug!("Stored {} past an unsaved row; checkpoint held", row.url);
                }
                Err(e) => {
                    checkpointing = false;
                    tracing::error!("Failed to store row for {}: {}", row.url, e);
                }
            }

            tracing::info!(
                "[{}/{}] {} {}",
                index + 1,
                queue.len(),
                if stored.has_payload() { "stored" } else { "empty" },
                row.url
            );

            if index < last {
                self.wait.wait(self.pause.next_delay()).await;
            }
        }

        self.progress.save(&mut record);

        tracing::info!(
            "Detail fetch finished: {} fetched, {} with data, {} failed",
            outcome.processed,
            outcome.added,
            outcome.failed
        );

        Ok(outcome.finish(CrawlStatus::Completed, &record))
    }

    /// Fetches one detail page and serializes its listing payload
    async fn fetch_payload(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch(url).await {
            FetchResult::Success { body, .. } => {
                let Some(payload) = extract_listing_payload(&body) else {
                    tracing::warn!("No listing data found in {}", url);
                    return None;
                };
                match serde_json::to_string(&payload) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        tracing::warn!("Failed to serialize listing data from {}: {}", url, e);
                        None
                    }
                }
            }
            failure => {
                tracing::warn!("Failed to fetch {}: {}", url, failure.cause());
                None
            }
        }
    }
}
