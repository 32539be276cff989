//! Detail fetch tests, including the crawl-to-flatten pipeline

use crate::common::{detail_page, listing_page, test_config};
use rental_harvest::crawler::{
    CrawlStatus, DetailFetcher, ListingCrawler, RecordingWait, ShutdownFlag,
};
use rental_harvest::flatten::{run_flatten, FLAT_COLUMNS};
use rental_harvest::progress::{ProgressStore, Stage};
use rental_harvest::storage::{CsvDetailTable, DetailTable};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_detail(server: &MockServer, route: &str, body: String, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn listing_data(price: u64) -> Value {
    json!({
        "props": {
            "pageProps": {
                "ad": {
                    "target": {
                        "Price": price,
                        "Area": "48",
                        "Rooms_num": ["2"],
                        "Extras_types": ["balcony", "lift"]
                    },
                    "location": {
                        "address": {
                            "street": {"name": "ul. Grójecka"},
                            "district": {"name": "Ochota"}
                        },
                        "coordinates": {"latitude": 52.2146, "longitude": 20.9796}
                    }
                }
            }
        }
    })
}

#[tokio::test]
async fn test_pipeline_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
            "/pl/oferta/dobre-ID1",
            "/pl/oferta/bez-danych-ID2",
            "/pl/oferta/usuniete-ID3",
        ])))
        .mount(&server)
        .await;
    mount_detail(&server, "/pl/oferta/dobre-ID1", detail_page(&listing_data(3000)), 1).await;
    mount_detail(
        &server,
        "/pl/oferta/bez-danych-ID2",
        "<html><body><h1>Ogłoszenie</h1></body></html>".to_string(),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/pl/oferta/usuniete-ID3"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(
        dir.path(),
        &format!("{}/search", server.uri()),
        &server.uri(),
        1,
    );

    let crawl = ListingCrawler::new(&config, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();
    assert_eq!(crawl.total_completed, 3);

    let table = CsvDetailTable::new(&config.output.raw_table_path);
    let mut fetcher = DetailFetcher::new(&config, table, RecordingWait::new()).unwrap();
    let outcome = fetcher.run(&ShutdownFlag::new()).await.unwrap();

    assert_eq!(outcome.status, CrawlStatus::Completed);
    assert_eq!(outcome.cursor, 2);
    assert_eq!(outcome.total_completed, 3);
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.failed, 2);

    let rows = fetcher.table().load_rows().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].url.ends_with("/pl/oferta/dobre-ID1"));

    let stored: Value = serde_json::from_str(rows[0].raw_json.as_deref().unwrap()).unwrap();
    assert_eq!(stored["target"]["Price"], json!(3000));
    assert_eq!(rows[1].raw_json, None);
    assert_eq!(rows[2].raw_json, None);

    let summary = run_flatten(&config).unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.empty, 2);

    let mut reader = csv::Reader::from_path(&config.output.flattened_path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, FLAT_COLUMNS.to_vec());

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(&records[0][1], "3000");
    assert_eq!(&records[0][2], "ul. Grójecka");
    assert_eq!(&records[0][3], "Ochota");
    assert_eq!(&records[0][15], "balcony, lift");
    assert!(records[1].iter().skip(1).all(str::is_empty));
}

#[tokio::test]
async fn test_resume_skips_checkpointed_urls() {
    let server = MockServer::start().await;
    mount_detail(&server, "/pl/oferta/a-ID1", detail_page(&listing_data(1000)), 0).await;
    mount_detail(&server, "/pl/oferta/b-ID2", detail_page(&listing_data(2000)), 1).await;
    mount_detail(&server, "/pl/oferta/c-ID3", detail_page(&listing_data(3000)), 1).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), "https://www.otodom.pl/search", &server.uri(), 1);

    let urls: Vec<String> = ["a-ID1", "b-ID2", "c-ID3"]
        .iter()
        .map(|slug| format!("{}/pl/oferta/{}", server.uri(), slug))
        .collect();
    std::fs::write(&config.output.url_list_path, urls.join("\n") + "\n").unwrap();

    // A previous run stored the first listing and checkpointed it
    std::fs::write(
        &config.output.raw_table_path,
        format!("url,raw_json\n{},\"{{\"\"target\"\":{{}}}}\"\n", urls[0]),
    )
    .unwrap();
    std::fs::write(
        &config.output.detail_progress_path,
        r#"{"cursor": 0, "total_completed": 1}"#,
    )
    .unwrap();

    let table = CsvDetailTable::new(&config.output.raw_table_path);
    let mut fetcher = DetailFetcher::new(&config, table, RecordingWait::new()).unwrap();
    let outcome = fetcher.run(&ShutdownFlag::new()).await.unwrap();

    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.cursor, 2);
    assert_eq!(outcome.total_completed, 3);

    // Nothing left: no further requests
    let table = CsvDetailTable::new(&config.output.raw_table_path);
    let again = DetailFetcher::new(&config, table, RecordingWait::new())
        .unwrap()
        .run(&ShutdownFlag::new())
        .await
        .unwrap();
    assert_eq!(again.status, CrawlStatus::AlreadyComplete);

    let rows = CsvDetailTable::new(&config.output.raw_table_path)
        .load_rows()
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.has_payload()));
}

#[tokio::test]
async fn test_failed_listing_is_not_retried_on_next_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pl/oferta/gone-ID1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_detail(&server, "/pl/oferta/new-ID2", detail_page(&listing_data(2500)), 1).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), "https://www.otodom.pl/search", &server.uri(), 1);
    let gone = format!("{}/pl/oferta/gone-ID1", server.uri());
    let new = format!("{}/pl/oferta/new-ID2", server.uri());

    std::fs::write(&config.output.url_list_path, format!("{}\n", gone)).unwrap();
    let first = DetailFetcher::new(
        &config,
        CsvDetailTable::new(&config.output.raw_table_path),
        RecordingWait::new(),
    )
    .unwrap()
    .run(&ShutdownFlag::new())
    .await
    .unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.cursor, 0);

    // The crawl later discovers another listing
    std::fs::write(&config.output.url_list_path, format!("{}\n{}\n", gone, new)).unwrap();
    let second = DetailFetcher::new(
        &config,
        CsvDetailTable::new(&config.output.raw_table_path),
        RecordingWait::new(),
    )
    .unwrap()
    .run(&ShutdownFlag::new())
    .await
    .unwrap();

    assert_eq!(second.processed, 1);
    assert_eq!(second.added, 1);
    assert_eq!(second.cursor, 1);

    let record = ProgressStore::new(&config.output.detail_progress_path, Stage::DetailFetch).load();
    assert_eq!(record.total_completed, 2);
}
