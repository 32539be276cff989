use crate::config::types::{Config, CrawlerConfig, DelayConfig, FetcherConfig, OutputConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_delay_config(&config.delays)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates listing discovery configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;
    validate_http_url("origin", &config.origin)?;

    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.max_page < 1 {
        return Err(ConfigError::Validation(format!(
            "max_page must be >= 1, got {}",
            config.max_page
        )));
    }

    validate_selector("card_selector", &config.card_selector)?;
    validate_selector("link_selector", &config.link_selector)?;

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates request pauses
fn validate_delay_config(config: &DelayConfig) -> Result<(), ConfigError> {
    if config.courtesy_min_ms > config.courtesy_max_ms {
        return Err(ConfigError::Validation(format!(
            "courtesy_min_ms ({}) must not exceed courtesy_max_ms ({})",
            config.courtesy_min_ms, config.courtesy_max_ms
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("url_list_path", &config.url_list_path),
        ("raw_table_path", &config.raw_table_path),
        ("flattened_path", &config.flattened_path),
        ("crawl_progress_path", &config.crawl_progress_path),
        ("detail_progress_path", &config.detail_progress_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.crawl_progress_path == config.detail_progress_path {
        return Err(ConfigError::Validation(
            "crawl_progress_path and detail_progress_path must differ".to_string(),
        ));
    }

    if config.raw_table_path == config.flattened_path {
        return Err(ConfigError::Validation(
            "raw_table_path and flattened_path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a URL parses and uses HTTP or HTTPS
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            name, value
        )));
    }

    Ok(())
}

fn validate_selector(name: &str, value: &str) -> Result<(), ConfigError> {
    Selector::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, value, e)))
}
