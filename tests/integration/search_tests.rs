//! Integration tests for search, suggest and top
//!
//! Most tests seed an in-memory store directly; the last one crawls a
//! wiremock site and searches what the crawl stored.

use chrono::Utc;
use ripple_search::config::Config;
use ripple_search::crawler::Crawler;
use ripple_search::search::{SearchEngine, ELLIPSIS};
use ripple_search::storage::{PageContent, PageStore, SqliteStorage};
use std::sync::{Arc, Mutex};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_storage() -> Arc<Mutex<SqliteStorage>> {
    Arc::new(Mutex::new(
        SqliteStorage::new_in_memory().expect("Failed to open in-memory store"),
    ))
}

/// Stores a crawled page and gives it `backlinks` incoming links
fn add_page(
    storage: &Arc<Mutex<SqliteStorage>>,
    url: &str,
    title: &str,
    description: &str,
    content: &str,
    backlinks: u32,
) {
    let url = Url::parse(url).unwrap();
    let mut storage = storage.lock().unwrap();
    storage
        .upsert_content(
            &url,
            &PageContent {
                title: title.to_string(),
                description: description.to_string(),
                content: content.to_string(),
            },
            Utc::now(),
        )
        .unwrap();
    for _ in 0..backlinks {
        storage.increment_backlink(&url).unwrap();
    }
}

#[test]
fn test_pagination_over_23_matches() {
    let storage = create_storage();
    for i in 0..23 {
        add_page(
            &storage,
            &format!("https://docs.test/page{:02}", i),
            &format!("Rust page {}", i),
            "",
            "",
            0,
        );
    }
    let engine = SearchEngine::new(Arc::clone(&storage));

    let first = engine.search("rust", 1, 10).unwrap();
    assert_eq!(first.total, 23);
    assert_eq!(first.pages, 3);
    assert_eq!(first.results.len(), 10);

    let third = engine.search("rust", 3, 10).unwrap();
    assert_eq!(third.page, 3);
    assert_eq!(third.results.len(), 3);

    let clamped = engine.search("rust", 0, 10).unwrap();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.results, first.results);

    let negative = engine.search("rust", -4, 10).unwrap();
    assert_eq!(negative.page, 1);

    let beyond = engine.search("rust", 4, 10).unwrap();
    assert!(beyond.results.is_empty());
    assert_eq!(beyond.total, 23);

    let oversized = engine.search("rust", 1, 500).unwrap();
    assert_eq!(oversized.results.len(), 23);
    assert_eq!(oversized.pages, 1);
}

#[test]
fn test_empty_query_returns_nothing() {
    let storage = create_storage();
    add_page(&storage, "https://a.test/", "Anything", "", "", 3);
    let engine = SearchEngine::new(storage);

    let response = engine.search("", 1, 10).unwrap();
    assert!(response.results.is_empty());
    assert_eq!(response.total, 0);
    assert_eq!(response.page, 1);
    assert_eq!(response.pages, 0);

    assert!(engine.search(" \t ", 2, 10).unwrap().results.is_empty());
}

#[test]
fn test_split_terms_match_compound_word() {
    let storage = create_storage();
    add_page(&storage, "https://a.test/js", "JavaScript Guide", "", "closures", 0);
    add_page(&storage, "https://a.test/java", "Java Tutorial", "", "classes", 0);
    add_page(&storage, "https://a.test/py", "Python Basics", "", "lists", 0);
    let engine = SearchEngine::new(storage);

    let response = engine.search("java script", 1, 10).unwrap();
    let urls: Vec<&str> = response.results.iter().map(|r| r.url.as_str()).collect();

    assert_eq!(response.total, 2);
    assert_eq!(urls, vec!["https://a.test/js", "https://a.test/java"]);
    assert_eq!(
        response.results[0].title_html,
        "<mark>Java</mark><mark>Script</mark> Guide"
    );
}

#[test]
fn test_backlinks_break_relevance_ties() {
    let storage = create_storage();
    add_page(&storage, "https://a.test/quiet", "Tokio notes", "", "", 1);
    add_page(&storage, "https://a.test/famous", "Tokio guide", "", "", 12);
    add_page(&storage, "https://a.test/body", "Other", "", "uses tokio", 40);
    let engine = SearchEngine::new(storage);

    let response = engine.search("tokio", 1, 10).unwrap();
    let urls: Vec<&str> = response.results.iter().map(|r| r.url.as_str()).collect();

    // Title hits outrank a content hit regardless of backlinks
    assert_eq!(
        urls,
        vec![
            "https://a.test/famous",
            "https://a.test/quiet",
            "https://a.test/body"
        ]
    );
    assert_eq!(response.results[0].backlinks, 12);
}

#[test]
fn test_snippets_are_escaped() {
    let storage = create_storage();
    let filler = "lorem ipsum ".repeat(20);
    add_page(
        &storage,
        "https://a.test/xss",
        "<script>alert(1)</script> Rust",
        "",
        &format!("{}<script>alert(1)</script> rust & friends {}", filler, filler),
        0,
    );
    let engine = SearchEngine::new(storage);

    let response = engine.search("rust", 1, 10).unwrap();
    let hit = &response.results[0];

    for html in [&hit.title_html, &hit.snippet_html] {
        assert!(!html.contains("<script"));
        let without_marks = html.replace("<mark>", "").replace("</mark>", "");
        assert!(!without_marks.contains('<'), "live markup in {}", html);
    }
    assert!(hit.snippet_html.contains("&lt;script&gt;"));
    assert!(hit.snippet_html.contains("<mark>rust</mark> &amp; friends"));
    assert!(hit.snippet_html.starts_with(ELLIPSIS));
    assert!(hit.snippet_html.ends_with(ELLIPSIS));
}

#[test]
fn test_suggest_and_top() {
    let storage = create_storage();
    add_page(&storage, "https://a.test/tokio", "Tokio", "", "", 2);
    add_page(&storage, "https://a.test/tokens", "Token Streams", "", "", 7);
    add_page(&storage, "https://a.test/serde", "Serde", "", "", 30);
    {
        let mut storage = storage.lock().unwrap();
        let stub = Url::parse("https://b.test/tokenizer").unwrap();
        storage.increment_backlink(&stub).unwrap();
    }
    let engine = SearchEngine::new(storage);

    // One ranked match ("tokio"), then title backfill on "tok"
    let suggestions = engine.suggest("tokio", 5).unwrap();
    let urls: Vec<&str> = suggestions.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.test/tokio", "https://a.test/tokens"]);
    assert_eq!(suggestions[1].title_html, "<mark>Tok</mark>en Streams");

    assert!(engine.suggest("   ", 5).unwrap().is_empty());

    let top = engine.top(2).unwrap();
    let urls: Vec<&str> = top.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.test/serde", "https://a.test/tokens"]);
}

#[tokio::test]
async fn test_crawl_then_search() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let home = format!(
        r#"<html><head><title>Home</title></head><body>
        <a href="{0}/async">Async</a><a href="{0}/async">Async again</a><a href="{0}/sync">Sync</a>
        </body></html>"#,
        base
    );
    let async_page = r#"<html><head><title>Async Rust</title>
        <meta name="description" content="Futures and executors"></head>
        <body><p>Async Rust uses futures polled by an executor.</p></body></html>"#;
    let sync_page = r#"<html><head><title>Threads in Rust</title></head>
        <body><p>Threads in Rust share data with Arc.</p></body></html>"#;

    for (route, body) in [
        ("/", home),
        ("/async", async_page.to_string()),
        ("/sync", sync_page.to_string()),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(&mock_server)
            .await;
    }

    let storage = create_storage();
    let crawler = Crawler::new(&Config::default_for(":memory:"), Arc::clone(&storage)).unwrap();
    crawler.crawl(&format!("{}/", base), 1).await.unwrap();

    let engine = SearchEngine::new(storage);
    let response = engine.search("rust", 1, 10).unwrap();
    assert_eq!(response.total, 2);

    // Equal title relevance; the twice-linked page wins on backlinks
    let first = &response.results[0];
    assert_eq!(first.url, format!("{}/async", base));
    assert_eq!(first.backlinks, 2);
    assert_eq!(first.description, "Futures and executors");
    assert_eq!(
        first.snippet_html,
        "Async <mark>Rust</mark> uses futures polled by an executor."
    );

    let top = engine.top(1).unwrap();
    assert_eq!(top[0].url, format!("{}/async", base));
}
