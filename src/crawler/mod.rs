//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a per-request deadline
//! - HTML parsing for title, description, body text and links
//! - The depth-bounded crawl loop with its worker pool
//! - Periodic re-crawl scheduling

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{CrawlReport, Crawler};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use parser::{normalize_whitespace, parse_html, ParsedPage};
pub use scheduler::Scheduler;

use crate::config::Config;
use crate::storage::PageStore;
use crate::RippleError;
use std::sync::{Arc, Mutex};

/// Runs a single crawl from `seed_url` to completion
///
/// This is the main entry point for a one-shot crawl. It builds a crawler
/// from `config`, then crawls up to `config.crawler.max_depth` hops.
///
/// # Example
///
/// ```no_run
/// use ripple_search::config::load_config;
/// use ripple_search::crawler::crawl;
/// use ripple_search::storage::SqliteStorage;
/// use std::path::Path;
/// use std::sync::{Arc, Mutex};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
/// let report = crawl(&config, Arc::new(Mutex::new(storage)), "https://example.com/").await?;
/// println!("{} pages crawled", report.pages_crawled);
/// # Ok(())
/// # }
/// ```
pub async fn crawl<S>(
    config: &Config,
    storage: Arc<Mutex<S>>,
    seed_url: &str,
) -> Result<CrawlReport, RippleError>
where
    S: PageStore + Send + 'static,
{
    let crawler = Crawler::new(config, storage)?;
    crawler.crawl(seed_url, config.crawler.max_depth).await
}
