use serde::Deserialize;

/// Main configuration structure for Rental-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub delays: DelayConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Listing discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Search results URL; the page parameter is added or replaced per page
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Site origin used to resolve relative listing links
    pub origin: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Last page to crawl (inclusive)
    #[serde(rename = "max-page", default = "default_max_page")]
    pub max_page: u32,

    /// Selector for one listing card on a results page
    #[serde(rename = "card-selector", default = "default_card_selector")]
    pub card_selector: String,

    /// Selector for the detail link inside a card
    #[serde(rename = "link-selector", default = "default_link_selector")]
    pub link_selector: String,
}

/// HTTP fetch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts for a URL before giving up
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between attempts (seconds)
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

/// Pauses between requests
#[derive(Debug, Clone, Deserialize)]
pub struct DelayConfig {
    /// Lower bound of the randomized pause between result pages (milliseconds)
    #[serde(rename = "courtesy-min-ms", default = "default_courtesy_min_ms")]
    pub courtesy_min_ms: u64,

    /// Upper bound of the randomized pause between result pages (milliseconds)
    #[serde(rename = "courtesy-max-ms", default = "default_courtesy_max_ms")]
    pub courtesy_max_ms: u64,

    /// Fixed pause between detail page fetches (milliseconds)
    #[serde(rename = "detail-pause-ms", default = "default_detail_pause_ms")]
    pub detail_pause_ms: u64,
}

/// Output file locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Append-only list of discovered listing URLs
    #[serde(rename = "url-list-path", default = "default_url_list_path")]
    pub url_list_path: String,

    /// CSV table of `url,raw_json` rows
    #[serde(rename = "raw-table-path", default = "default_raw_table_path")]
    pub raw_table_path: String,

    /// CSV table of flattened listing rows
    #[serde(rename = "flattened-path", default = "default_flattened_path")]
    pub flattened_path: String,

    #[serde(rename = "crawl-progress-path", default = "default_crawl_progress_path")]
    pub crawl_progress_path: String,

    #[serde(
        rename = "detail-progress-path",
        default = "default_detail_progress_path"
    )]
    pub detail_progress_path: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            courtesy_min_ms: default_courtesy_min_ms(),
            courtesy_max_ms: default_courtesy_max_ms(),
            detail_pause_ms: default_detail_pause_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            url_list_path: default_url_list_path(),
            raw_table_path: default_raw_table_path(),
            flattened_path: default_flattened_path(),
            crawl_progress_path: default_crawl_progress_path(),
            detail_progress_path: default_detail_progress_path(),
        }
    }
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_max_page() -> u32 {
    200
}

fn default_card_selector() -> String {
    "article.css-136g1q2".to_string()
}

fn default_link_selector() -> String {
    r#"a[href*="/pl/oferta/"]"#.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

fn default_courtesy_min_ms() -> u64 {
    2000
}

fn default_courtesy_max_ms() -> u64 {
    5000
}

fn default_detail_pause_ms() -> u64 {
    1000
}

fn default_url_list_path() -> String {
    "warsaw_rental_urls.txt".to_string()
}

fn default_raw_table_path() -> String {
    "warsaw_rentals.csv".to_string()
}

fn default_flattened_path() -> String {
    "output_rentals.csv".to_string()
}

fn default_crawl_progress_path() -> String {
    "scraper_progress.json".to_string()
}

fn default_detail_progress_path() -> String {
    "scraping_progress.json".to_string()
}
