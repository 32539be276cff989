//! Progress module for resumable pipeline stages
//!
//! # Components
//!
//! - `Stage`: identifies the listing crawl and the detail fetch
//! - `ProgressRecord`: cursor, completed count, and last update time
//! - `ProgressStore`: loads and atomically saves one stage's record

mod record;
mod store;

// Re-export main types
pub use record::{ProgressRecord, Stage};
pub use store::ProgressStore;
