//! Crawler coordinator - main crawl orchestration logic
//!
//! One call to [`Crawler::crawl`] is one crawl invocation: a single seed, its
//! own visited set and its own depth-bounded frontier. Pages are fetched by a
//! bounded pool of worker tasks, while the frontier and the visited set are
//! owned by the coordinating loop alone.

use crate::config::Config;
use crate::crawler::{build_http_client, fetch_url, parse_html, FetchResult};
use crate::storage::{PageContent, PageStore, RunStatus};
use crate::url::normalize_url;
use crate::RippleError;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

/// Progress is logged every this many finished pages
const PROGRESS_INTERVAL: u64 = 10;

/// A URL waiting to be visited, with its hop distance from the seed
#[derive(Debug, Clone)]
struct FrontierEntry {
    url: Url,
    depth: u32,
}

/// What a worker reports back to the coordinating loop
#[derive(Debug)]
enum PageOutcome {
    Crawled {
        depth: u32,
        links: Vec<Url>,
        backlinks_recorded: u64,
    },
    Failed,
}

/// Summary of one crawl invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Row in the `runs` table, when run bookkeeping succeeded
    pub run_id: Option<i64>,

    /// The normalized seed URL
    pub seed_url: String,

    /// Pages fetched, extracted and stored
    pub pages_crawled: u64,

    /// Pages whose fetch or store write failed
    pub pages_failed: u64,

    /// Backlink increments performed (one per link occurrence)
    pub links_recorded: u64,

    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn pages_visited(&self) -> u64 {
        self.pages_crawled + self.pages_failed
    }
}

/// Crawls from a seed URL, storing page content and backlink counts
pub struct Crawler<S> {
    storage: Arc<Mutex<S>>,
    client: Client,
    workers: usize,
    fetch_timeout: Duration,
    config_hash: String,
}

impl<S> Clone for Crawler<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            client: self.client.clone(),
            workers: self.workers,
            fetch_timeout: self.fetch_timeout,
            config_hash: self.config_hash.clone(),
        }
    }
}

impl<S> Crawler<S>
where
    S: PageStore + Send + 'static,
{
    /// Creates a crawler writing into the shared store
    ///
    /// # Arguments
    ///
    /// * `config` - Supplies the user agent, worker count and fetch deadline
    /// * `storage` - The page store shared with searchers and other crawls
    pub fn new(config: &Config, storage: Arc<Mutex<S>>) -> Result<Self, RippleError> {
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            storage,
            client,
            workers: config.crawler.workers.max(1) as usize,
            fetch_timeout: Duration::from_millis(config.crawler.fetch_timeout_ms),
            config_hash: String::new(),
        })
    }

    /// Records `hash` on every run this crawler starts
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    pub fn storage(&self) -> &Arc<Mutex<S>> {
        &self.storage
    }

    /// Crawls from `seed_url` following links up to `max_depth` hops
    ///
    /// The seed is depth 0. Each URL is fetched at most once per invocation;
    /// a page at `max_depth` is stored and its links counted, but the links
    /// are not followed. A failure on one URL is logged and counted in the
    /// report, it never aborts the crawl.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The frontier was exhausted
    /// * `Err(RippleError)` - The seed is not a valid http(s) URL
    pub async fn crawl(&self, seed_url: &str, max_depth: u32) -> Result<CrawlReport, RippleError> {
        let seed = normalize_url(seed_url)?;
        let start_time = Instant::now();

        let run_id = self.start_run(&seed, max_depth);
        tracing::info!(
            "Starting crawl of {} (max depth {}, {} workers)",
            seed,
            max_depth,
            self.workers
        );

        let mut report = CrawlReport {
            run_id,
            seed_url: seed.to_string(),
            ..CrawlReport::default()
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier = vec![FrontierEntry {
            url: seed,
            depth: 0,
        }];
        let mut in_flight = JoinSet::new();

        loop {
            // Fill idle workers; the visited check and mark happen here, before
            // any I/O, so no URL is dispatched twice.
            while in_flight.len() < self.workers {
                let Some(entry) = frontier.pop() else {
                    break;
                };
                if entry.depth > max_depth || !visited.insert(entry.url.to_string()) {
                    continue;
                }

                in_flight.spawn(process_page(
                    Arc::clone(&self.storage),
                    self.client.clone(),
                    self.fetch_timeout,
                    entry,
                ));
            }

            let Some(joined) = in_flight.join_next().await else {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            };

            match joined {
                Ok(PageOutcome::Crawled {
                    depth,
                    links,
                    backlinks_recorded,
                }) => {
                    report.pages_crawled += 1;
                    report.links_recorded += backlinks_recorded;

                    if depth < max_depth {
                        // Reversed so the first link on the page is popped first
                        frontier.extend(links.into_iter().rev().map(|url| FrontierEntry {
                            url,
                            depth: depth + 1,
                        }));
                    }
                }
                Ok(PageOutcome::Failed) => report.pages_failed += 1,
                Err(e) => {
                    tracing::error!("Crawl worker aborted: {}", e);
                    report.pages_failed += 1;
                }
            }

            if report.pages_visited() % PROGRESS_INTERVAL == 0 {
                let elapsed = start_time.elapsed();
                tracing::info!(
                    "Progress: {} pages crawled, {} failed, {} in frontier, {:.2} pages/sec",
                    report.pages_crawled,
                    report.pages_failed,
                    frontier.len(),
                    report.pages_visited() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                );
            }
        }

        report.elapsed = start_time.elapsed();
        self.finish_run(&report);

        tracing::info!(
            "Crawl of {} completed: {} pages crawled, {} failed, {} links recorded in {:?}",
            report.seed_url,
            report.pages_crawled,
            report.pages_failed,
            report.links_recorded,
            report.elapsed
        );

        Ok(report)
    }

    /// Starts a crawl in the background without waiting for it
    ///
    /// The returned handle may be dropped; the crawl keeps running and logs
    /// its own outcome.
    pub fn spawn(&self, seed_url: String, max_depth: u32) -> JoinHandle<Option<CrawlReport>> {
        let crawler = self.clone();
        tokio::spawn(async move {
            match crawler.crawl(&seed_url, max_depth).await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::error!("Crawl of {} failed: {}", seed_url, e);
                    None
                }
            }
        })
    }

    fn lock_storage(&self) -> Result<MutexGuard<'_, S>, RippleError> {
        self.storage.lock().map_err(|_| RippleError::LockPoisoned)
    }

    fn start_run(&self, seed: &Url, max_depth: u32) -> Option<i64> {
        let created = self.lock_storage().and_then(|mut storage| {
            storage
                .create_run(seed.as_str(), max_depth, &self.config_hash)
                .map_err(RippleError::from)
        });

        match created {
            Ok(run_id) => Some(run_id),
            Err(e) => {
                tracing::warn!("Could not record crawl run for {}: {}", seed, e);
                None
            }
        }
    }

    fn finish_run(&self, report: &CrawlReport) {
        let Some(run_id) = report.run_id else {
            return;
        };

        // A run that could not even store its seed is a failed run
        let status = if report.pages_crawled == 0 && report.pages_failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        let finished = self.lock_storage().and_then(|mut storage| {
            storage
                .finish_run(run_id, status, report.pages_crawled, report.pages_failed)
                .map_err(RippleError::from)
        });

        if let Err(e) = finished {
            tracing::warn!("Could not finish crawl run {}: {}", run_id, e);
        }
    }
}

/// Fetches, extracts and stores one page
async fn process_page<S: PageStore>(
    storage: Arc<Mutex<S>>,
    client: Client,
    timeout: Duration,
    entry: FrontierEntry,
) -> PageOutcome {
    let FrontierEntry { url, depth } = entry;
    tracing::debug!("Processing URL: {} (depth {})", url, depth);

    let (final_url, body) = match fetch_url(&client, &url, timeout).await {
        FetchResult::Success {
            final_url, body, ..
        } => (final_url, body),
        failure => {
            tracing::warn!("Failed to fetch {}: {}", url, failure.describe());
            return PageOutcome::Failed;
        }
    };

    // Relative links resolve against where the server actually sent us
    let parsed = parse_html(&body, &final_url);
    let links = normalize_links(&parsed.links);
    // Untitled pages are titled with the URL they are stored under
    let content = PageContent {
        title: parsed.title.unwrap_or_else(|| url.to_string()),
        description: parsed.description,
        content: parsed.body_text,
    };

    match record_page(&storage, &url, &content, &links) {
        Ok(backlinks_recorded) => PageOutcome::Crawled {
            depth,
            links,
            backlinks_recorded,
        },
        Err(e) => {
            tracing::warn!("Failed to store {}: {}", url, e);
            PageOutcome::Failed
        }
    }
}

/// Writes page content, then one backlink per link occurrence
///
/// A failed content write fails the page. A failed increment only loses that
/// one increment.
fn record_page<S: PageStore>(
    storage: &Mutex<S>,
    url: &Url,
    content: &PageContent,
    links: &[Url],
) -> Result<u64, RippleError> {
    let mut storage = storage.lock().map_err(|_| RippleError::LockPoisoned)?;
    storage.upsert_content(url, content, Utc::now())?;

    let mut recorded = 0;
    for link in links {
        match storage.increment_backlink(link) {
            Ok(_) => recorded += 1,
            Err(e) => tracing::warn!("Failed to record link {} -> {}: {}", url, link, e),
        }
    }

    Ok(recorded)
}

fn normalize_links(links: &[String]) -> Vec<Url> {
    links
        .iter()
        .filter_map(|link| match normalize_url(link) {
            Ok(normalized) => Some(normalized),
            Err(e) => {
                tracing::debug!("Failed to normalize URL {}: {}", link, e);
                None
            }
        })
        .collect()
}
