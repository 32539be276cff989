//! HTML parser for search-result pages
//!
//! This module handles parsing listing pages to extract:
//! - One detail-page link per listing card
//! - Absolute, normalized URLs for those links

use crate::config::CrawlerConfig;
use crate::ConfigError;
use scraper::{Html, Selector};
use url::Url;

/// Query parameters that only carry tracking state
const TRACKING_PARAMS: [&str; 2] = ["fbclid", "gclid"];

/// Compiled selectors for listing cards and their detail links
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    card: Selector,
    link: Selector,
}

impl ListingSelectors {
    /// Parses both selectors, rejecting invalid CSS
    pub fn parse(card: &str, link: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            card: parse_selector(card)?,
            link: parse_selector(link)?,
        })
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self, ConfigError> {
        Self::parse(&config.card_selector, &config.link_selector)
    }
}

fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector(format!("{}: {:?}", css, e)))
}

/// Extracts detail-page URLs from a search-result page
///
/// For each element matching the card selector, the first descendant
/// matching the link selector is taken. Cards without one contribute
/// nothing. Output keeps page order and may contain duplicates; the crawl
/// driver deduplicates.
///
/// # Arguments
///
/// * `html` - Raw HTML of the search-result page
/// * `origin` - Site origin used to resolve relative links
/// * `selectors` - Compiled card and link selectors
///
/// # Returns
///
/// Absolute, normalized detail URLs. Empty or unparseable input yields an
/// empty vector.
///
/// # Example
///
/// ```
/// use rental_harvest::crawler::{extract_listing_urls, ListingSelectors};
/// use url::Url;
///
/// let selectors = ListingSelectors::parse("article", r#"a[href*="/pl/oferta/"]"#).unwrap();
/// let origin = Url::parse("https://www.otodom.pl").unwrap();
/// let html = r#"<article><a href="/pl/oferta/flat-ID1">Flat</a></article>"#;
/// assert_eq!(
///     extract_listing_urls(html, &origin, &selectors),
///     vec!["https://www.otodom.pl/pl/oferta/flat-ID1".to_string()]
/// );
/// ```
pub fn extract_listing_urls(
    html: &str,
    origin: &Url,
    selectors: &ListingSelectors,
) -> Vec<String> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(html);

    document
        .select(&selectors.card)
        .filter_map(|card| card.select(&selectors.link).next())
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| normalize_listing_url(href, origin))
        .collect()
}

/// Resolves an href against the origin and normalizes it
///
/// Returns None if the link should be excluded:
/// - empty, fragment-only, javascript: or mailto: hrefs
/// - hrefs that do not resolve to an HTTP(S) URL
///
/// Otherwise the fragment and tracking parameters are removed, and a
/// trailing slash is dropped from non-root paths.
pub fn normalize_listing_url(href: &str, origin: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    let mut url = origin.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed.as_str() });
    }

    Some(url.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
