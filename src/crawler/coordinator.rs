//! Listing crawl driver
//!
//! Walks search-result pages in ascending order and appends newly seen
//! detail URLs to the URL list, including:
//! - Resuming from the last checkpointed page
//! - Skipping pages whose fetch fails
//! - Checkpointing only after the page's URLs are on disk
//! - Stopping cleanly between pages on shutdown

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::parser::{extract_listing_urls, ListingSelectors};
use crate::crawler::scheduler::{CourtesyDelay, ShutdownFlag, WaitPolicy};
use crate::crawler::{CrawlOutcome, CrawlStatus};
use crate::progress::{ProgressStore, Stage};
use crate::storage::UrlList;
use crate::HarvestError;
use url::Url;

/// Drives the paginated listing crawl
pub struct ListingCrawler<W> {
    base_url: Url,
    origin: Url,
    page_param: String,
    max_page: u32,
    selectors: ListingSelectors,
    fetcher: Fetcher<W>,
    wait: W,
    courtesy: CourtesyDelay,
    url_list: UrlList,
    progress: ProgressStore,
}

impl<W: WaitPolicy + Clone> ListingCrawler<W> {
    /// Creates a crawler from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `wait` - Policy used for retry backoff and courtesy pauses
    pub fn new(config: &Config, wait: W) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::new(&config.fetcher, wait.clone())?;
        Self::with_fetcher(config, fetcher, wait)
    }

    /// Creates a crawler around an existing fetcher
    pub fn with_fetcher(
        config: &Config,
        fetcher: Fetcher<W>,
        wait: W,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            base_url: Url::parse(&config.crawler.base_url)?,
            origin: Url::parse(&config.crawler.origin)?,
            page_param: config.crawler.page_param.clone(),
            max_page: config.crawler.max_page,
            selectors: ListingSelectors::from_config(&config.crawler)?,
            fetcher,
            wait,
            courtesy: CourtesyDelay::uniform_ms(
                config.delays.courtesy_min_ms,
                config.delays.courtesy_max_ms,
            ),
            url_list: UrlList::new(&config.output.url_list_path),
            progress: ProgressStore::new(&config.output.crawl_progress_path, Stage::ListingCrawl),
        })
    }

    pub fn progress_store(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn url_list(&self) -> &UrlList {
        &self.url_list
    }

    /// Builds the URL of a search-result page
    ///
    /// The page parameter replaces an existing one in place, or is appended
    /// after the other query parameters.
    pub fn page_url(&self, page: u32) -> String {
        let mut url = self.base_url.clone();
        let page_value = page.to_string();

        let mut replaced = false;
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (key, value) in self.base_url.query_pairs() {
            if key == self.page_param.as_str() {
                if !replaced {
                    pairs.push((key.into_owned(), page_value.clone()));
                    replaced = true;
                }
            } else {
                pairs.push((key.into_owned(), value.into_owned()));
            }
        }
        if !replaced {
            pairs.push((self.page_param.clone(), page_value));
        }

        url.query_pairs_mut().clear().extend_pairs(pairs);
        url.to_string()
    }

    /// Runs the crawl from the page after the stored cursor to `max_page`
    pub async fn run(&self, shutdown: &ShutdownFlag) -> Result<CrawlOutcome, HarvestError> {
        let mut record = self.progress.load();
        let mut seen = self.url_list.load_set()?;
        let mut outcome = CrawlOutcome::start(Stage::ListingCrawl);

        let start = u32::try_from(record.next_unit().max(1)).unwrap_or(u32::MAX);
        if start > self.max_page {
            tracing::info!(
                "All {} pages already crawled ({} URLs collected)",
                self.max_page,
                record.total_completed
            );
            return Ok(outcome.finish(CrawlStatus::AlreadyComplete, &record));
        }

        tracing::info!(
            "Crawling pages {}..={} ({} URLs already known)",
            start,
            self.max_page,
            seen.len()
        );

        for page in start..=self.max_page {
            if shutdown.is_triggered() {
                tracing::warn!("Stopping before page {}", page);
                self.progress.save(&mut record);
                return Ok(outcome.finish(CrawlStatus::Interrupted, &record));
            }

            let page_url = self.page_url(page);
            outcome.processed += 1;

            match self.fetcher.fetch(&page_url).await {
                FetchResult::Success { body, .. } => {
                    let found = extract_listing_urls(&body, &self.origin, &self.selectors);
                    let found_count = found.len();
                    let new_urls: Vec<String> = found
                        .into_iter()
                        .filter(|url| seen.insert(url.clone()))
                        .collect();

                    if new_urls.is_empty() {
                        tracing::info!("Page {}: {} listings, nothing new", page, found_count);
                    } else {
                        match self.url_list.append(&new_urls) {
                            Ok(()) => {
                                let count = new_urls.len() as u64;
                                record.complete(i64::from(page), count);
                                self.progress.save(&mut record);
                                outcome.added += count;
                                tracing::info!(
                                    "Page {}: {} new URLs ({} total)",
                                    page,
                                    count,
                                    record.total_completed
                                );
                            }
                            Err(e) => {
                                for url in &new_urls {
                                    seen.remove(url);
                                }
                                outcome.failed += 1;
                                tracing::warn!(
                                    "Page {}: failed to append {} URLs to {}: {}",
                                    page,
                                    new_urls.len(),
                                    self.url_list.path().display(),
                                    e
                                );
                            }
                        }
                    }
                }
                failure => {
                    outcome.failed += 1;
                    tracing::warn!("Page {}: skipped, {}", page, failure.cause());
                }
            }

            if page < self.max_page {
                self.wait.wait(self.courtesy.next_delay()).await;
            }
        }

        tracing::info!(
            "Listing crawl finished: {} new URLs this run, {} total",
            outcome.added,
            record.total_completed
        );

        Ok(outcome.finish(CrawlStatus::Completed, &record))
    }
}
