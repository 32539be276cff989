//! Flattener tests over a raw table on disk

use crate::common::test_config;
use rental_harvest::flatten::{run_flatten, FLAT_COLUMNS};
use tempfile::TempDir;

#[test]
fn test_flatten_handles_partial_and_broken_payloads() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), "https://www.otodom.pl/search", "https://www.otodom.pl", 1);

    let mut writer = csv::Writer::from_path(&config.output.raw_table_path).unwrap();
    writer.write_record(["url", "raw_json"]).unwrap();
    writer
        .write_record([
            "https://www.otodom.pl/pl/oferta/pelne-ID1",
            r#"{"target":{"Price":5200,"Heating":["gas"],"Media_types":["internet","phone"],"Building_floors_num":4},"location":{"address":{"street":{"name":"ul. Marszałkowska"},"district":{"name":"Śródmieście"}},"coordinates":{"latitude":52.23,"longitude":21.01}}}"#,
        ])
        .unwrap();
    writer
        .write_record([
            "https://www.otodom.pl/pl/oferta/czesciowe-ID2",
            r#"{"target":{"Price":3000,"Rooms_num":[]}}"#,
        ])
        .unwrap();
    writer
        .write_record(["https://www.otodom.pl/pl/oferta/zepsute-ID3", "{not json"])
        .unwrap();
    writer
        .write_record(["https://www.otodom.pl/pl/oferta/puste-ID4", ""])
        .unwrap();
    writer.flush().unwrap();
    drop(writer);

    let summary = run_flatten(&config).unwrap();
    assert_eq!(summary.rows, 4);
    assert_eq!(summary.empty, 2);

    let mut reader = csv::Reader::from_path(&config.output.flattened_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), FLAT_COLUMNS.len());
    let col = |name: &str| headers.iter().position(|h| h == name).unwrap();

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 4);

    let full = &records[0];
    assert_eq!(&full[col("price")], "5200");
    assert_eq!(&full[col("heating")], "gas");
    assert_eq!(&full[col("media_types")], "internet, phone");
    assert_eq!(&full[col("building_floors_num")], "4");
    assert_eq!(&full[col("street")], "ul. Marszałkowska");
    assert_eq!(&full[col("district")], "Śródmieście");
    assert_eq!(&full[col("latitude")], "52.23");

    let partial = &records[1];
    assert_eq!(&partial[col("price")], "3000");
    assert_eq!(&partial[col("rooms_num")], "");
    assert_eq!(&partial[col("street")], "");
    assert_eq!(&partial[col("longitude")], "");

    for record in &records[2..] {
        assert!(record[col("url")].starts_with("https://www.otodom.pl/pl/oferta/"));
        assert!(record.iter().skip(1).all(str::is_empty));
    }
}

#[test]
fn test_flatten_without_raw_table_writes_header_only() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), "https://www.otodom.pl/search", "https://www.otodom.pl", 1);

    let summary = run_flatten(&config).unwrap();
    assert_eq!(summary.rows, 0);

    let content = std::fs::read_to_string(&config.output.flattened_path).unwrap();
    assert_eq!(content.trim_end(), FLAT_COLUMNS.join(","));
}
