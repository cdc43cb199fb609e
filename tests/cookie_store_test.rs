//! Cookie persistence round-trips

use jobscout::browser::cookies::{read_cookie_file, write_cookie_file};
use jobscout::{CookieRecord, CookieStore};

fn sample_cookies() -> Vec<CookieRecord> {
    vec![
        CookieRecord {
            name: "session".to_string(),
            value: "abc123".to_string(),
            domain: ".boards.example".to_string(),
            path: "/".to_string(),
            expires: Some(1_893_456_000.0),
            http_only: true,
            secure: true,
        },
        CookieRecord::from_pair("theme", "dark", "boards.example"),
    ]
}

#[test]
fn file_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let cookies = sample_cookies();

    write_cookie_file(dir.path(), "boards.example", &cookies).unwrap();
    let loaded = read_cookie_file(dir.path(), "boards.example").unwrap().unwrap();
    assert_eq!(loaded, cookies);
}

#[test]
fn missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_cookie_file(dir.path(), "never-seen.example").unwrap().is_none());
}

#[tokio::test]
async fn store_saves_through_its_worker() {
    let dir = tempfile::tempdir().unwrap();
    let store = CookieStore::new(dir.path().to_path_buf());
    let cookies = sample_cookies();

    store.save("boards.example", cookies.clone());
    store.flush().await;

    assert_eq!(store.load("boards.example"), cookies);
    store.shutdown().await;
}

#[tokio::test]
async fn store_loads_empty_for_unknown_domain() {
    let dir = tempfile::tempdir().unwrap();
    let store = CookieStore::new(dir.path().to_path_buf());
    assert!(store.load("unknown.example").is_empty());
    store.shutdown().await;
}

#[test]
fn cookie_param_conversion_keeps_identity() {
    let record = sample_cookies().remove(0);
    let param = record.to_param().unwrap();
    assert_eq!(param.name, record.name);
    assert_eq!(param.value, record.value);
    assert_eq!(param.domain.as_deref(), Some(record.domain.as_str()));
}
