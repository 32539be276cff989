//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building HTTP clients with a browser-like header set
//! - GET requests with a fixed timeout
//! - Retry logic for rate limiting and transient network failures
//! - Error classification

use crate::config::FetcherConfig;
use crate::crawler::scheduler::WaitPolicy;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS};
use reqwest::{Client, StatusCode};
use std::time::Duration;

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Every attempt was answered with HTTP 429
    RateLimited {
        /// Number of attempts made
        attempts: u32,
    },

    /// Non-retryable HTTP status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (timeout, connection failure) on every attempt
    NetworkError {
        /// Description of the last error
        error: String,
        /// Number of attempts made
        attempts: u32,
    },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short description of why the fetch failed, for status messages
    pub fn cause(&self) -> String {
        match self {
            Self::Success { status_code, .. } => format!("HTTP {}", status_code),
            Self::RateLimited { attempts } => {
                format!("rate limited (HTTP 429) after {} attempts", attempts)
            }
            Self::HttpError { status_code } => format!("HTTP {}", status_code),
            Self::NetworkError { error, attempts } => {
                format!("{} after {} attempts", error, attempts)
            }
        }
    }
}

/// Builds an HTTP client with browser-like headers and a fixed timeout
///
/// Header values that are not valid HTTP header text are skipped.
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// GET fetcher with bounded retries
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200 | Success |
/// | HTTP 429 | Retry, waiting `retry_delay * attempt` |
/// | Other status | Immediate → HttpError |
/// | Timeout / connection error | Retry, waiting `retry_delay` |
///
/// At most `max_retries` attempts are made in total.
pub struct Fetcher<W> {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    wait: W,
}

impl<W: WaitPolicy> Fetcher<W> {
    /// Creates a fetcher from configuration
    pub fn new(config: &FetcherConfig, wait: W) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(
            client,
            config.max_retries,
            Duration::from_secs(config.retry_delay_secs),
            wait,
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, max_retries: u32, retry_delay: Duration, wait: W) -> Self {
        Self {
            client,
            max_retries: max_retries.max(1),
            retry_delay,
            wait,
        }
    }

    /// Fetches a URL with full error handling and retry logic
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::OK {
                        let final_url = response.url().to_string();
                        match response.text().await {
                            Ok(body) => {
                                return FetchResult::Success {
                                    final_url,
                                    status_code: status.as_u16(),
                                    body,
                                };
                            }
                            Err(e) => {
                                last_error = describe_error(&e);
                                tracing::warn!(
                                    "Failed to read body of {} (attempt {}/{}): {}",
                                    url,
                                    attempt,
                                    self.max_retries,
                                    last_error
                                );
                            }
                        }
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        if attempt == self.max_retries {
                            return FetchResult::RateLimited { attempts: attempt };
                        }
                        let backoff = self.retry_delay * attempt;
                        tracing::warn!(
                            "Rate limited on {}. Waiting {:?} before retry {}/{}",
                            url,
                            backoff,
                            attempt + 1,
                            self.max_retries
                        );
                        self.wait.wait(backoff).await;
                        continue;
                    } else {
                        tracing::debug!("{} returned HTTP {}", url, status.as_u16());
                        return FetchResult::HttpError {
                            status_code: status.as_u16(),
                        };
                    }
                }
                Err(e) => {
                    last_error = describe_error(&e);
                    tracing::warn!(
                        "Request error for {} (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.max_retries,
                        last_error
                    );
                }
            }

            if attempt < self.max_retries {
                self.wait.wait(self.retry_delay).await;
            }
        }

        FetchResult::NetworkError {
            error: last_error,
            attempts: self.max_retries,
        }
    }
}

/// Classifies a transport error into a short description
fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection failed".to_string()
    } else {
        e.to_string()
    }
}
