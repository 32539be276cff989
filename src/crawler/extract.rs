//! Listing payload extraction from detail pages
//!
//! Detail pages embed their data in a `__NEXT_DATA__` JSON script block.
//! The listing object lives at `props.pageProps.ad`.

use crate::flatten::json_path::get_path;
use scraper::{Html, Selector};
use serde_json::Value;

const NEXT_DATA_SELECTOR: &str = r#"script#__NEXT_DATA__[type="application/json"]"#;

const LISTING_PATH: [&str; 3] = ["props", "pageProps", "ad"];

/// Parses the embedded `__NEXT_DATA__` block, if any
pub fn extract_next_data(html: &str) -> Option<Value> {
    let selector = Selector::parse(NEXT_DATA_SELECTOR).ok()?;
    let document = Html::parse_document(html);
    let script = document.select(&selector).next()?;
    let text: String = script.text().collect();

    match serde_json::from_str(text.trim()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Embedded data block is not valid JSON: {}", e);
            None
        }
    }
}

/// Extracts the listing object from a detail page
///
/// # Arguments
///
/// * `html` - Raw HTML of the detail page
///
/// # Returns
///
/// The `props.pageProps.ad` object. None when the script block is missing,
/// its JSON is invalid, any key on the path is missing or null, or the
/// listing is not a non-empty object.
pub fn extract_listing_payload(html: &str) -> Option<Value> {
    let data = extract_next_data(html)?;

    match get_path(&data, &LISTING_PATH)? {
        Value::Object(map) if !map.is_empty() => Some(Value::Object(map.clone())),
        _ => {
            tracing::debug!("Listing data is empty or not an object");
            None
        }
    }
}
