//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against an in-memory store.

use chrono::{DateTime, Utc};
use ripple_search::config::Config;
use ripple_search::crawler::{Crawler, Scheduler};
use ripple_search::state::PageState;
use ripple_search::storage::{
    PageContent, PageRecord, PageStore, RunRecord, RunStatus, ScoredPage, SqliteStorage,
    StorageError, StorageResult,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short timeouts
fn create_test_config(workers: u32) -> Config {
    let mut config = Config::default_for(":memory:");
    config.crawler.workers = workers;
    config.crawler.fetch_timeout_ms = 2_000;
    config
}

fn create_crawler(workers: u32) -> Crawler<SqliteStorage> {
    let storage = Arc::new(Mutex::new(
        SqliteStorage::new_in_memory().expect("Failed to open in-memory store"),
    ));
    Crawler::new(&create_test_config(workers), storage).expect("Failed to build crawler")
}

/// Builds an HTML page linking to each of `links`
fn html_page(title: &str, body: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
        title, body, anchors
    )
}

/// Mounts an HTML page that must be fetched exactly `times` times
async fn mount_page(server: &MockServer, route: &str, html: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .expect(times)
        .mount(server)
        .await;
}

/// Mounts A→B,C and B→A,D
async fn mount_diamond(server: &MockServer, times: u64) {
    let base = server.uri();
    mount_page(
        server,
        "/a",
        html_page("Page A", "alpha", &[format!("{}/b", base), format!("{}/c", base)]),
        times,
    )
    .await;
    mount_page(
        server,
        "/b",
        html_page("Page B", "bravo", &[format!("{}/a", base), format!("{}/d", base)]),
        times,
    )
    .await;
    mount_page(server, "/c", html_page("Page C", "charlie", &[]), times).await;
    mount_page(server, "/d", html_page("Page D", "delta", &[]), times).await;
}

/// SQLite store that rejects chosen writes
///
/// `upsert_content` fails for `reject_content` and `increment_backlink` fails
/// for `reject_backlinks`; everything else goes to the wrapped store.
struct RejectingStore {
    inner: SqliteStorage,
    reject_content: Option<String>,
    reject_backlinks: Option<String>,
}

impl RejectingStore {
    fn new(reject_content: Option<String>, reject_backlinks: Option<String>) -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().expect("Failed to open in-memory store"),
            reject_content,
            reject_backlinks,
        }
    }
}

fn rejected(url: &Url, target: &Option<String>) -> bool {
    target.as_deref() == Some(url.as_str())
}

impl PageStore for RejectingStore {
    fn upsert_content(
        &mut self,
        url: &Url,
        content: &PageContent,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        if rejected(url, &self.reject_content) {
            return Err(StorageError::Database(format!("disk full writing {}", url)));
        }
        self.inner.upsert_content(url, content, crawled_at)
    }

    fn increment_backlink(&mut self, url: &Url) -> StorageResult<u64> {
        if rejected(url, &self.reject_backlinks) {
            return Err(StorageError::Database(format!("disk full linking {}", url)));
        }
        self.inner.increment_backlink(url)
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        self.inner.get_page(url)
    }

    fn search_pages(
        &self,
        terms: &[String],
        limit: u32,
        skip: u64,
    ) -> StorageResult<Vec<ScoredPage>> {
        self.inner.search_pages(terms, limit, skip)
    }

    fn count_matches(&self, terms: &[String]) -> StorageResult<u64> {
        self.inner.count_matches(terms)
    }

    fn top_by_backlinks(&self, limit: u32) -> StorageResult<Vec<PageRecord>> {
        self.inner.top_by_backlinks(limit)
    }

    fn suggest_titles(
        &self,
        fragment: &str,
        limit: u32,
        exclude: &[String],
    ) -> StorageResult<Vec<PageRecord>> {
        self.inner.suggest_titles(fragment, limit, exclude)
    }

    fn create_run(
        &mut self,
        seed_url: &str,
        max_depth: u32,
        config_hash: &str,
    ) -> StorageResult<i64> {
        self.inner.create_run(seed_url, max_depth, config_hash)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_crawled: u64,
        pages_failed: u64,
    ) -> StorageResult<()> {
        self.inner.finish_run(run_id, status, pages_crawled, pages_failed)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn count_total_pages(&self) -> StorageResult<u64> {
        self.inner.count_total_pages()
    }

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        self.inner.count_pages_by_state(state)
    }

    fn total_backlinks(&self) -> StorageResult<u64> {
        self.inner.total_backlinks()
    }

    fn count_unique_hosts(&self) -> StorageResult<u64> {
        self.inner.count_unique_hosts()
    }

    fn count_runs(&self) -> StorageResult<u64> {
        self.inner.count_runs()
    }
}

fn create_rejecting_crawler(
    reject_content: Option<String>,
    reject_backlinks: Option<String>,
) -> Crawler<RejectingStore> {
    let storage = Arc::new(Mutex::new(RejectingStore::new(
        reject_content,
        reject_backlinks,
    )));
    Crawler::new(&create_test_config(2), storage).expect("Failed to build crawler")
}

fn backlinks(crawler: &Crawler<SqliteStorage>, url: &str) -> u64 {
    crawler
        .storage()
        .lock()
        .unwrap()
        .get_page(url)
        .unwrap()
        .unwrap_or_else(|| panic!("No page stored for {}", url))
        .backlinks
}

#[tokio::test]
async fn test_diamond_crawl_counts_backlinks() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_diamond(&mock_server, 1).await;

    let crawler = create_crawler(1);
    let report = crawler
        .crawl(&format!("{}/a", base), 2)
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages_crawled, 4);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.links_recorded, 4);

    for page in ["a", "b", "c", "d"] {
        assert_eq!(backlinks(&crawler, &format!("{}/{}", base, page)), 1, "page {}", page);
    }

    let storage = crawler.storage().lock().unwrap();
    let d = storage.get_page(&format!("{}/d", base)).unwrap().unwrap();
    assert_eq!(d.state(), PageState::Crawled);
    assert_eq!(d.title(), "Page D");
    assert_eq!(d.content(), "delta");

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, report.run_id.unwrap());
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.pages_crawled, 4);
}

#[tokio::test]
async fn test_worker_pool_gives_same_counts() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_diamond(&mock_server, 1).await;

    let crawler = create_crawler(4);
    let report = crawler.crawl(&format!("{}/a", base), 2).await.unwrap();

    assert_eq!(report.pages_crawled, 4);
    for page in ["a", "b", "c", "d"] {
        assert_eq!(backlinks(&crawler, &format!("{}/{}", base, page)), 1);
    }
}

#[tokio::test]
async fn test_cycles_terminate_with_single_fetch() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    // x links to itself and to y; y links back to x
    mount_page(
        &mock_server,
        "/x",
        html_page("X", "", &[format!("{}/x", base), format!("{}/y", base)]),
        1,
    )
    .await;
    mount_page(&mock_server, "/y", html_page("Y", "", &[format!("{}/x", base)]), 1).await;

    let crawler = create_crawler(2);
    let report = crawler.crawl(&format!("{}/x", base), 10).await.unwrap();

    assert_eq!(report.pages_crawled, 2);
    assert_eq!(backlinks(&crawler, &format!("{}/x", base)), 2);
    assert_eq!(backlinks(&crawler, &format!("{}/y", base)), 1);
}

#[tokio::test]
async fn test_depth_zero_visits_only_seed() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(
        &mock_server,
        "/root",
        html_page("Root", "", &[format!("{}/child", base), format!("{}/child", base)]),
        1,
    )
    .await;
    mount_page(&mock_server, "/child", html_page("Child", "", &[]), 0).await;

    let crawler = create_crawler(1);
    let report = crawler.crawl(&format!("{}/root", base), 0).await.unwrap();

    assert_eq!(report.pages_crawled, 1);

    // Both link occurrences count, but the child stays a stub
    let storage = crawler.storage().lock().unwrap();
    let child = storage.get_page(&format!("{}/child", base)).unwrap().unwrap();
    assert_eq!(child.backlinks, 2);
    assert_eq!(child.state(), PageState::Stub);
}

#[tokio::test]
async fn test_links_are_normalized() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let html = format!(
        r##"<html><head><title>Root</title></head><body>
        <a href="/target/">one</a>
        <a href="{}/target#section">two</a>
        <a href="/target?utm_source=feed">three</a>
        <a href="mailto:someone@example.com">mail</a>
        </body></html>"##,
        base
    );
    mount_page(&mock_server, "/", html, 1).await;
    mount_page(&mock_server, "/target", html_page("Target", "", &[]), 1).await;

    let crawler = create_crawler(1);
    crawler.crawl(&format!("{}/", base), 1).await.unwrap();

    assert_eq!(backlinks(&crawler, &format!("{}/target", base)), 3);
}

#[tokio::test]
async fn test_fetch_failure_leaves_record_unchanged() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let crawler = create_crawler(1);
    let broken = url::Url::parse(&format!("{}/broken", base)).unwrap();
    {
        let mut storage = crawler.storage().lock().unwrap();
        storage
            .upsert_content(
                &broken,
                &PageContent {
                    title: "Old title".to_string(),
                    description: String::new(),
                    content: "old content".to_string(),
                },
                chrono::Utc::now(),
            )
            .unwrap();
        storage.increment_backlink(&broken).unwrap();
    }
    let before = crawler
        .storage()
        .lock()
        .unwrap()
        .get_page(broken.as_str())
        .unwrap();

    let report = crawler.crawl(broken.as_str(), 2).await.unwrap();
    assert_eq!(report.pages_crawled, 0);
    assert_eq!(report.pages_failed, 1);

    let storage = crawler.storage().lock().unwrap();
    assert_eq!(storage.get_page(broken.as_str()).unwrap(), before);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Failed
    );
}

#[tokio::test]
async fn test_non_html_and_slow_pages_fail() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html_page(
            "Root",
            "",
            &[format!("{}/data.json", base), format!("{}/slow", base)],
        ),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><title>Slow</title></html>", "text/html")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(2);
    config.crawler.fetch_timeout_ms = 200;
    let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let crawler = Crawler::new(&config, storage).unwrap();

    let report = crawler.crawl(&format!("{}/", base), 1).await.unwrap();
    assert_eq!(report.pages_crawled, 1);
    assert_eq!(report.pages_failed, 2);

    // Failed targets keep their backlinks but never gain content
    let storage = crawler.storage().lock().unwrap();
    for route in ["data.json", "slow"] {
        let page = storage
            .get_page(&format!("{}/{}", base, route))
            .unwrap()
            .unwrap();
        assert_eq!(page.state(), PageState::Stub);
        assert_eq!(page.backlinks, 1);
    }
}

#[tokio::test]
async fn test_recrawl_adds_backlinks_and_keeps_content() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_diamond(&mock_server, 2).await;

    let crawler = create_crawler(1);
    let seed = format!("{}/a", base);
    crawler.crawl(&seed, 2).await.unwrap();
    crawler.crawl(&seed, 2).await.unwrap();

    for page in ["a", "b", "c", "d"] {
        assert_eq!(backlinks(&crawler, &format!("{}/{}", base, page)), 2);
    }

    let storage = crawler.storage().lock().unwrap();
    let b = storage.get_page(&format!("{}/b", base)).unwrap().unwrap();
    assert_eq!(b.title(), "Page B");
    assert_eq!(b.content(), "bravo");
    assert_eq!(storage.count_runs().unwrap(), 2);
}

#[tokio::test]
async fn test_scheduler_boot_crawl() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_diamond(&mock_server, 1).await;

    let mut config = create_test_config(2);
    config.crawler.max_depth = 2;
    config.crawler.seeds = vec![format!("{}/a", base)];

    let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    let crawler = Crawler::new(&config, Arc::clone(&storage)).unwrap();
    let scheduler = Scheduler::new(crawler, &config.crawler);

    tokio::time::timeout(Duration::from_secs(10), scheduler.run())
        .await
        .expect("Boot crawl did not finish");

    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_total_pages().unwrap(), 4);
    assert_eq!(storage.total_backlinks().unwrap(), 4);
}

#[tokio::test]
async fn test_content_write_failure_stays_local() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_diamond(&mock_server, 1).await;

    let crawler = create_rejecting_crawler(Some(format!("{}/c", base)), None);
    let report = crawler.crawl(&format!("{}/a", base), 2).await.unwrap();

    assert_eq!(report.pages_crawled, 3);
    assert_eq!(report.pages_failed, 1);

    let storage = crawler.storage().lock().unwrap();
    for route in ["a", "b", "d"] {
        let page = storage
            .get_page(&format!("{}/{}", base, route))
            .unwrap()
            .unwrap();
        assert_eq!(page.state(), PageState::Crawled, "page {}", route);
        assert_eq!(page.backlinks, 1, "page {}", route);
    }

    // The link from A still counts even though C's content was lost
    let c = storage.get_page(&format!("{}/c", base)).unwrap().unwrap();
    assert_eq!(c.state(), PageState::Stub);
    assert_eq!(c.backlinks, 1);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_backlink_write_failure_loses_one_increment() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_diamond(&mock_server, 1).await;

    let crawler = create_rejecting_crawler(None, Some(format!("{}/d", base)));
    let report = crawler.crawl(&format!("{}/a", base), 2).await.unwrap();

    // D is still followed and stored, it just never gains a backlink
    assert_eq!(report.pages_crawled, 4);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.links_recorded, 3);

    let storage = crawler.storage().lock().unwrap();
    let d = storage.get_page(&format!("{}/d", base)).unwrap().unwrap();
    assert_eq!(d.state(), PageState::Crawled);
    assert_eq!(d.backlinks, 0);
    for route in ["a", "b", "c"] {
        let page = storage
            .get_page(&format!("{}/{}", base, route))
            .unwrap()
            .unwrap();
        assert_eq!(page.backlinks, 1, "page {}", route);
    }
}

#[tokio::test]
async fn test_overlapping_crawls_keep_every_backlink() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    mount_diamond(&mock_server, 3).await;

    let crawler = create_crawler(4);
    let seed = format!("{}/a", base);
    let handles: Vec<_> = (0..3).map(|_| crawler.spawn(seed.clone(), 2)).collect();

    for handle in handles {
        let report = handle
            .await
            .expect("Crawl task panicked")
            .expect("Crawl produced no report");
        assert_eq!(report.pages_crawled, 4);
    }

    // Each run has its own visited set, so every run counts every link
    for page in ["a", "b", "c", "d"] {
        assert_eq!(backlinks(&crawler, &format!("{}/{}", base, page)), 3, "page {}", page);
    }
    assert_eq!(crawler.storage().lock().unwrap().count_runs().unwrap(), 3);
}

#[tokio::test]
async fn test_untitled_redirect_is_titled_with_requested_url() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/new", base).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/new",
        "<html><body><p>moved here</p></body></html>".to_string(),
        1,
    )
    .await;

    let crawler = create_crawler(1);
    let seed = format!("{}/old", base);
    crawler.crawl(&seed, 0).await.unwrap();

    let storage = crawler.storage().lock().unwrap();
    let page = storage.get_page(&seed).unwrap().unwrap();
    assert_eq!(page.title(), seed);
    assert_eq!(page.content(), "moved here");
    assert!(storage.get_page(&format!("{}/new", base)).unwrap().is_none());
}
