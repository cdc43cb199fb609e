//! End-to-end orchestrator runs over mock static sources
//!
//! The browser pool is constructed but never launches a browser: these
//! feeds all use static transports.

use std::sync::Arc;

use jobscout::{
    BrowserPool, BrowserPoolConfig, Feed, Orchestrator, ProxyPool, Transport,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn orchestrator(cookies_dir: &std::path::Path) -> Orchestrator {
    let pool = BrowserPool::new(
        BrowserPoolConfig {
            cookies_dir: cookies_dir.to_path_buf(),
            ..BrowserPoolConfig::default()
        },
        Arc::new(ProxyPool::from_entries(Vec::new())),
    );
    Orchestrator::with_defaults(pool).unwrap()
}

#[tokio::test]
async fn run_filters_matches_and_dedups() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;

    let body = serde_json::json!([
        {"id": "1", "title": "Customer Support Specialist", "company": "TechCorp"},
        {"id": "2", "title": "Customer Support Spec.", "company": "TechCorp"},
        {"id": "3", "title": "Senior Software Engineer", "company": "TechCorp"},
        {"id": "4", "title": "Compliance Analyst", "company": "FinCo"}
    ]);
    let _mock = server
        .mock("GET", "/jobs")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let orchestrator = orchestrator(dir.path());
    let feed = Feed::new("mock", format!("{}/jobs", server.url()), Transport::Json);

    let jobs = orchestrator.run(std::slice::from_ref(&feed)).await.unwrap();

    // The engineer is excluded by the matcher; the re-worded support role
    // is a fuzzy duplicate of the first.
    let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "4"]);

    let snapshot = orchestrator.metrics().snapshot();
    assert_eq!(snapshot.jobs_fetched["mock"], 2);
    assert_eq!(snapshot.duplicates_removed, 1);

    let state = orchestrator.source_state("mock").unwrap();
    assert_eq!(state.error_count, 0);
    assert!(state.last_fetched.is_some());
    assert!(!state.quarantined);
}

#[tokio::test]
async fn permanent_errors_yield_empty_without_retries() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;

    // 404 is permanent: exactly one request, empty batch, error recorded.
    let mock = server
        .mock("GET", "/gone")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let orchestrator = orchestrator(dir.path());
    let feed = Feed::new("gone", format!("{}/gone", server.url()), Transport::Json);

    let jobs = orchestrator.run_source(&feed).await.unwrap();
    mock.assert_async().await;
    assert!(jobs.is_empty());

    let state = orchestrator.source_state("gone").unwrap();
    assert_eq!(state.error_count, 1);
    assert!(state.last_error.contains("not found"));

    let snapshot = orchestrator.metrics().snapshot();
    assert_eq!(snapshot.fetch_errors["gone:permanent"], 1);
}

#[tokio::test]
async fn failing_source_does_not_impact_others() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;

    let _bad = server
        .mock("GET", "/bad")
        .with_status(404)
        .create_async()
        .await;
    let _good = server
        .mock("GET", "/good")
        .with_status(200)
        .with_body(r#"[{"id": "g1", "title": "Support Agent", "company": "Acme"}]"#)
        .create_async()
        .await;

    let orchestrator = orchestrator(dir.path());
    let feeds = vec![
        Feed::new("bad", format!("{}/bad", server.url()), Transport::Json),
        Feed::new("good", format!("{}/good", server.url()), Transport::Json),
    ];

    let jobs = orchestrator.run(&feeds).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].source, "good");
}

#[tokio::test]
async fn expired_jobs_are_dropped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;

    let stale = (chrono::Utc::now() - chrono::Duration::days(30)).to_rfc3339();
    let body = serde_json::json!([
        {"id": "old", "title": "Customer Support Agent", "company": "Acme", "published_at": stale},
        {"id": "new", "title": "Customer Support Agent", "company": "Globex"}
    ]);
    let _mock = server
        .mock("GET", "/mixed")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let orchestrator = orchestrator(dir.path());
    let feed = Feed::new("mixed", format!("{}/mixed", server.url()), Transport::Json);

    let jobs = orchestrator.run_source(&feed).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "new");

    let snapshot = orchestrator.metrics().snapshot();
    assert_eq!(snapshot.expired_jobs_removed, 1);
}
