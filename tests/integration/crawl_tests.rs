//! Listing crawl tests against a mock search endpoint

use crate::common::{listing_page, read_lines, test_config};
use rental_harvest::crawler::{CrawlStatus, ListingCrawler, RecordingWait, ShutdownFlag};
use rental_harvest::progress::{ProgressStore, Stage};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORIGIN: &str = "https://www.otodom.pl";

async fn mount_listing(server: &MockServer, page: u32, hrefs: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(hrefs)))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, page: u32, status: u16, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn absolute(slug: &str) -> String {
    format!("{}/pl/oferta/{}", ORIGIN, slug)
}

#[tokio::test]
async fn test_crawl_collects_urls_and_second_run_appends_nothing() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["/pl/oferta/a-ID1", "/pl/oferta/b-ID2"]).await;
    mount_listing(&server, 2, &["/pl/oferta/c-ID3", "/pl/oferta/d-ID4"]).await;
    mount_listing(&server, 3, &["/pl/oferta/e-ID5"]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(
        dir.path(),
        &format!("{}/search?limit=72", server.uri()),
        ORIGIN,
        3,
    );

    let wait = RecordingWait::new();
    let crawler = ListingCrawler::new(&config, wait.clone()).unwrap();
    let outcome = crawler.run(&ShutdownFlag::new()).await.unwrap();

    assert_eq!(outcome.status, CrawlStatus::Completed);
    assert_eq!(outcome.cursor, 3);
    assert_eq!(outcome.total_completed, 5);
    assert_eq!(outcome.added, 5);
    // Courtesy pauses between pages, none after the last
    assert_eq!(wait.recorded(), vec![Duration::ZERO, Duration::ZERO]);

    let urls = read_lines(&config.output.url_list_path);
    assert_eq!(
        urls,
        vec![
            absolute("a-ID1"),
            absolute("b-ID2"),
            absolute("c-ID3"),
            absolute("d-ID4"),
            absolute("e-ID5"),
        ]
    );

    let second = ListingCrawler::new(&config, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    assert_eq!(second.status, CrawlStatus::AlreadyComplete);
    assert_eq!(second.added, 0);
    assert_eq!(second.total_completed, 5);
    assert_eq!(read_lines(&config.output.url_list_path), urls);
}

#[tokio::test]
async fn test_repeated_listings_are_written_once() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["/pl/oferta/a-ID1", "/pl/oferta/b-ID2"]).await;
    mount_listing(
        &server,
        2,
        &["/pl/oferta/b-ID2?utm_source=feed", "/pl/oferta/c-ID3"],
    )
    .await;
    mount_listing(&server, 3, &["/pl/oferta/a-ID1#map", "/pl/oferta/c-ID3/"]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &format!("{}/search", server.uri()), ORIGIN, 3);

    let outcome = ListingCrawler::new(&config, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    assert_eq!(
        read_lines(&config.output.url_list_path),
        vec![absolute("a-ID1"), absolute("b-ID2"), absolute("c-ID3")]
    );
    // Page 3 added nothing, so the checkpoint stays on page 2
    assert_eq!(outcome.cursor, 2);
    assert_eq!(outcome.total_completed, 3);
}

#[tokio::test]
async fn test_disjoint_runs_do_not_duplicate_known_urls() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["/pl/oferta/a-ID1", "/pl/oferta/b-ID2"]).await;
    mount_listing(&server, 2, &["/pl/oferta/b-ID2", "/pl/oferta/c-ID3"]).await;

    let dir = TempDir::new().unwrap();
    let base_url = format!("{}/search", server.uri());

    let first = test_config(dir.path(), &base_url, ORIGIN, 1);
    ListingCrawler::new(&first, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    let second = test_config(dir.path(), &base_url, ORIGIN, 2);
    let outcome = ListingCrawler::new(&second, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.total_completed, 3);
    assert_eq!(
        read_lines(&second.output.url_list_path),
        vec![absolute("a-ID1"), absolute("b-ID2"), absolute("c-ID3")]
    );
}

#[tokio::test]
async fn test_server_error_page_is_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["/pl/oferta/a-ID1"]).await;
    mount_status(&server, 2, 500, 1).await;
    mount_listing(&server, 3, &["/pl/oferta/c-ID3"]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &format!("{}/search", server.uri()), ORIGIN, 3);

    let wait = RecordingWait::new();
    let outcome = ListingCrawler::new(&config, wait.clone())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, CrawlStatus::Completed);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.cursor, 3);
    assert_eq!(
        read_lines(&config.output.url_list_path),
        vec![absolute("a-ID1"), absolute("c-ID3")]
    );
    // No retry waits for a 500
    assert!(wait.recorded().iter().all(|d| d.is_zero()));
}

#[tokio::test]
async fn test_rate_limited_page_is_skipped_after_backoff() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["/pl/oferta/a-ID1"]).await;
    mount_status(&server, 2, 429, 3).await;
    mount_listing(&server, 3, &["/pl/oferta/c-ID3"]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &format!("{}/search", server.uri()), ORIGIN, 3);

    let wait = RecordingWait::new();
    let outcome = ListingCrawler::new(&config, wait.clone())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.total_completed, 2);
    assert_eq!(
        wait.recorded(),
        vec![
            Duration::ZERO,
            Duration::from_secs(5),
            Duration::from_secs(10),
            Duration::ZERO,
        ]
    );
}

#[tokio::test]
async fn test_resume_starts_after_saved_page() {
    let server = MockServer::start().await;
    mount_status(&server, 1, 200, 0).await;
    mount_status(&server, 2, 200, 0).await;
    mount_listing(&server, 3, &["/pl/oferta/c-ID3"]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &format!("{}/search", server.uri()), ORIGIN, 3);
    std::fs::write(&config.output.url_list_path, format!("{}\n", absolute("a-ID1"))).unwrap();
    std::fs::write(
        &config.output.crawl_progress_path,
        r#"{"last_page": 2, "total_urls": 1, "last_updated": "2024-03-01T12:00:00.123456"}"#,
    )
    .unwrap();

    let outcome = ListingCrawler::new(&config, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.cursor, 3);
    assert_eq!(outcome.total_completed, 2);

    let record = ProgressStore::new(&config.output.crawl_progress_path, Stage::ListingCrawl).load();
    assert_eq!(record.cursor, 3);
    assert!(record.updated_at.is_some());
}

#[tokio::test]
async fn test_corrupt_progress_restarts_from_first_page() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["/pl/oferta/a-ID1"]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &format!("{}/search", server.uri()), ORIGIN, 1);
    std::fs::write(&config.output.crawl_progress_path, "{\"cursor\": ").unwrap();

    let outcome = ListingCrawler::new(&config, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();

    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.cursor, 1);
}
