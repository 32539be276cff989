//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to serve search-result and detail pages and run
//! each stage against temporary output files.

mod crawl_tests;
mod detail_tests;
mod flatten_tests;
