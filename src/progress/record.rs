/// Progress record definitions for resumable pipeline stages
///
/// Each stage keeps one record: the index of its last fully persisted unit,
/// how many units produced output, and when the record was last written.
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A resumable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Paginated search results; units are 1-based page numbers
    ListingCrawl,

    /// Per-URL detail fetches; units are 0-based queue indices
    DetailFetch,
}

impl Stage {
    /// The cursor value meaning "nothing completed yet"
    ///
    /// Pages start at 1, so the listing crawl resumes from `0 + 1`. Queue
    /// indices start at 0, so the detail stage resumes from `-1 + 1`.
    pub fn zero_cursor(&self) -> i64 {
        match self {
            Self::ListingCrawl => 0,
            Self::DetailFetch => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingCrawl => "listing-crawl",
            Self::DetailFetch => "detail-fetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable checkpoint for one stage
///
/// The legacy field names written by earlier scraper scripts (`last_page`,
/// `last_processed`, `total_urls`, `last_updated`) are accepted on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Index of the last completed unit
    #[serde(alias = "last_page", alias = "last_processed")]
    pub cursor: i64,

    /// Number of output items produced so far (URLs or detail rows)
    #[serde(default, alias = "total_urls")]
    pub total_completed: u64,

    #[serde(
        default,
        alias = "last_updated",
        deserialize_with = "deserialize_timestamp"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 timestamps and naive ISO timestamps (read as UTC)
///
/// Anything else becomes `None` rather than failing the whole record.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

impl ProgressRecord {
    /// A record for a stage with no completed work
    pub fn zero(stage: Stage) -> Self {
        Self {
            cursor: stage.zero_cursor(),
            total_completed: 0,
            updated_at: None,
        }
    }

    /// The first unit index that still needs work
    pub fn next_unit(&self) -> i64 {
        self.cursor + 1
    }

    /// Records that `unit` finished and produced `produced` items
    ///
    /// The cursor never moves backwards; a stale `unit` only adds its count.
    pub fn complete(&mut self, unit: i64, produced: u64) {
        self.cursor = self.cursor.max(unit);
        self.total_completed += produced;
    }
}
