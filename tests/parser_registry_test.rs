//! Parser registry and site parser behavior over fixture markup

use std::collections::HashSet;

use jobscout::{Feed, ParserRegistry, Transport};
use regex::Regex;
use scraper::Html;

fn feed(name: &str, url: &str, parser: &str) -> Feed {
    Feed::new(name, url, Transport::Html).with_parser(parser)
}

#[test]
fn duplicate_blocks_get_distinct_hash_ids() {
    // Fifty identical cards with no URL: every job must come out with its
    // own 16-hex-digit id.
    let card = r#"<job-card><h3>Customer Support Agent</h3><div class="company">SameCorp</div></job-card>"#;
    let html = format!("<html><body>{}</body></html>", card.repeat(50));
    let doc = Html::parse_document(&html);

    let registry = ParserRegistry::with_default_parsers();
    let jobs = registry.parse(&doc, &feed("stress", "https://board.example/jobs", "generic"));

    assert_eq!(jobs.len(), 50);

    let hex16 = Regex::new(r"^[a-f0-9]{16}$").unwrap();
    let ids: HashSet<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids.len(), 50, "all ids must be pairwise distinct");
    for job in &jobs {
        assert!(hex16.is_match(&job.id), "id {:?} is not a 16-hex hash", job.id);
        assert_eq!(job.title, "Customer Support Agent");
        assert_eq!(job.company, "SameCorp");
        assert!(job.url.is_empty());
    }
}

#[test]
fn generic_parser_resolves_relative_links() {
    let html = r#"
        <html><body>
            <div class="job-card">
                <h2>Support Engineer</h2>
                <span class="company">Acme</span>
                <a href="/jobs/42">view</a>
            </div>
        </body></html>
    "#;
    let doc = Html::parse_document(html);
    let registry = ParserRegistry::with_default_parsers();
    let jobs = registry.parse(&doc, &feed("acme", "https://board.example/listings", "generic"));

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].url, "https://board.example/jobs/42");
    assert_eq!(jobs[0].id, jobs[0].url, "URL-bearing cards use the URL as id");
}

#[test]
fn remoteok_rows_parse_with_native_ids() {
    let html = r#"
        <html><body><table>
            <tr class="job" data-id="100001">
                <td class="company">
                    <a href="/remote-jobs/100001">
                        <h2>Customer Support Lead</h2>
                        <h3>Globex</h3>
                    </a>
                </td>
                <td class="tags"><span class="tag">support</span><span class="tag">saas</span></td>
            </tr>
            <tr class="job" data-id="100002">
                <td class="company">
                    <a href="/remote-jobs/100002">
                        <h2>Helpdesk Technician</h2>
                        <h3>Initech</h3>
                    </a>
                </td>
            </tr>
        </table></body></html>
    "#;
    let doc = Html::parse_document(html);
    let registry = ParserRegistry::with_default_parsers();
    let jobs = registry.parse(
        &doc,
        &feed("remoteok", "https://remoteok.io/remote-customer-support-jobs", "remoteok"),
    );

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, "100001");
    assert_eq!(jobs[0].title, "Customer Support Lead");
    assert_eq!(jobs[0].company, "Globex");
    assert_eq!(jobs[0].url, "https://remoteok.io/remote-jobs/100001");
    assert_eq!(jobs[0].skills, vec!["support", "saas"]);
    assert!(jobs[1].is_remote);
}

#[test]
fn remotive_keeps_only_customer_service_tiles() {
    let html = r#"
        <html><body>
            <div class="job-tile remotive-bg-light">
                <a class="remotive-url-visit" href="/remote-jobs/cs/support-hero-1">
                    <span>Support Hero</span><span>•</span><span>HelpCo</span>
                </a>
                <span class="job-tile-category"><a>Customer Service</a></span>
                <span class="job-tile-location">Worldwide</span>
            </div>
            <div class="job-tile remotive-bg-sand-light">
                <a class="remotive-url-visit" href="/remote-jobs/dev/rust-dev-2">
                    <span>Rust Developer</span><span>•</span><span>CodeCo</span>
                </a>
                <span class="job-tile-category"><a>Software Development</a></span>
                <span class="job-tile-location">Worldwide</span>
            </div>
            <div class="job-tile remotive-bg-light">
                <a class="remotive-url-visit" href="/remote-jobs/cs/support-agent-3">
                    <span>Support Agent</span><span>•</span><span>DeskCo</span>
                </a>
                <span class="job-tile-category"><a>Customer Support</a></span>
                <span class="job-tile-location">Japan only</span>
            </div>
        </body></html>
    "#;
    let doc = Html::parse_document(html);
    let registry = ParserRegistry::with_default_parsers();
    let jobs = registry.parse(
        &doc,
        &feed("remotive", "https://remotive.com/remote-jobs/customer-support", "remotive"),
    );

    // The developer tile fails the category filter; the Japan tile fails
    // the location filter.
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].title, "Support Hero");
    assert_eq!(jobs[0].company, "HelpCo");
    assert_eq!(jobs[0].url, "https://remotive.com/remote-jobs/cs/support-hero-1");
    assert_eq!(jobs[0].id, "support-hero-1");
}

#[test]
fn unknown_parser_id_falls_back_to_generic() {
    let html = r#"<html><body><div class="job"><h2>Support Agent</h2><a href="https://x.example/1">x</a></div></body></html>"#;
    let doc = Html::parse_document(html);
    let registry = ParserRegistry::with_default_parsers();
    let jobs = registry.parse(&doc, &feed("mystery", "https://x.example", "no-such-parser"));
    assert_eq!(jobs.len(), 1);
}

#[test]
fn malformed_markup_yields_empty_not_panic() {
    let registry = ParserRegistry::with_default_parsers();
    for garbage in ["", "<<<>>>", "<html><body><div class=\"job\"></div></body></html>"] {
        let doc = Html::parse_document(garbage);
        let jobs = registry.parse(&doc, &feed("garbage", "https://x.example", "generic"));
        assert!(jobs.is_empty());
    }
}

#[test]
fn emitted_ids_are_always_pairwise_distinct() {
    // Same URL repeated: the id allocator must suffix the collisions.
    let html = r#"
        <html><body>
            <div class="job"><h2>Support Agent</h2><a href="https://x.example/same">a</a></div>
            <div class="job"><h2>Support Agent</h2><a href="https://x.example/same">b</a></div>
            <div class="job"><h2>Support Agent</h2><a href="https://x.example/same">c</a></div>
        </body></html>
    "#;
    let doc = Html::parse_document(html);
    let registry = ParserRegistry::with_default_parsers();
    let jobs = registry.parse(&doc, &feed("dupes", "https://x.example", "generic"));

    assert_eq!(jobs.len(), 3);
    let ids: HashSet<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
}
