//! Configuration loading and validation

use std::io::Write;

use jobscout::config::{load_feeds, load_file, ConfigError};
use jobscout::{ParserRegistry, Transport};

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[test]
fn full_config_loads() {
    let file = write_config(
        r#"
feeds:
  - name: acme-rss
    url: https://careers.acme.example/feed.xml
    type: rss
  - name: remotive
    url: https://remotive.com/remote-jobs/customer-support
    type: headless
    parser: remotive
    rate_limit: { requests_per_minute: 12, retry_after: 30 }
    headers:
      X-Api-Key: secret
    cookies:
      session: abc
    cache_duration: 60
filters:
  keywords: [support, compliance]
  locations: [Remote]
  exclude: [clearance]
  salary_min: 40000
  is_remote: true
  sources: [remotive]
"#,
    );

    let registry = ParserRegistry::with_default_parsers();
    let feeds = load_feeds(file.path(), Some(&registry)).unwrap();
    assert_eq!(feeds.len(), 2);

    assert_eq!(feeds[0].name, "acme-rss");
    assert_eq!(feeds[0].transport, Transport::Rss);
    assert!(feeds[0].rate_limit.is_none());

    let remotive = &feeds[1];
    assert_eq!(remotive.transport, Transport::Headless);
    assert_eq!(remotive.parser_id.as_deref(), Some("remotive"));
    assert_eq!(remotive.headers["X-Api-Key"], "secret");
    assert_eq!(remotive.cookies["session"], "abc");
    assert_eq!(remotive.cache_duration.as_secs(), 3600);
    let rl = remotive.rate_limit.as_ref().unwrap();
    assert!((rl.refill_rate - 0.2).abs() < 1e-9);
    assert_eq!(rl.initial_backoff.as_secs(), 30);

    let parsed = load_file(file.path()).unwrap();
    let filters = parsed.filters.unwrap();
    assert_eq!(filters.keywords, vec!["support", "compliance"]);
    assert_eq!(filters.salary_min, Some(40000));
    assert_eq!(filters.is_remote, Some(true));
}

#[test]
fn unknown_type_is_rejected_by_name() {
    let file = write_config(
        r#"
feeds:
  - name: broken
    url: https://x.example
    type: graphql
"#,
    );
    let err = load_feeds(file.path(), None).unwrap_err();
    match err {
        ConfigError::InvalidFeedType(msg) => assert!(msg.contains("graphql"), "{msg}"),
        other => panic!("expected InvalidFeedType, got {other:?}"),
    }
}

#[test]
fn html_feed_requires_a_parser() {
    let file = write_config(
        r#"
feeds:
  - name: plain
    url: https://x.example
    type: html
"#,
    );
    let err = load_feeds(file.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::MissingParser { .. }));
}

#[test]
fn unresolvable_parser_is_rejected() {
    let file = write_config(
        r#"
feeds:
  - name: typo
    url: https://x.example
    type: html
    parser: remotiv
"#,
    );
    let registry = ParserRegistry::with_default_parsers();
    let err = load_feeds(file.path(), Some(&registry)).unwrap_err();
    match err {
        ConfigError::UnknownParser { parser, .. } => assert_eq!(parser, "remotiv"),
        other => panic!("expected UnknownParser, got {other:?}"),
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let file = write_config(
        r#"
feeds:
  - name: twice
    url: https://a.example
    type: rss
  - name: twice
    url: https://b.example
    type: rss
"#,
    );
    let err = load_feeds(file.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateName(name) if name == "twice"));
}

#[test]
fn empty_url_is_rejected() {
    let file = write_config(
        r#"
feeds:
  - name: hollow
    url: ""
    type: rss
"#,
    );
    let err = load_feeds(file.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyUrl(name) if name == "hollow"));
}

#[test]
fn fetch_method_overrides_type() {
    let file = write_config(
        r#"
feeds:
  - name: upgraded
    url: https://x.example
    type: html
    parser: generic
    fetch_method: headless
"#,
    );
    let feeds = load_feeds(file.path(), None).unwrap();
    assert_eq!(feeds[0].transport, Transport::Headless);
}
