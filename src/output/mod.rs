//! Output module for reporting harvest progress
//!
//! This module handles:
//! - Collecting statistics from the progress files and tables
//! - Printing them for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};
