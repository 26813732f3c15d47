//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::PageState;
use crate::storage::{PageContent, PageRecord, RunRecord, RunStatus, ScoredPage};
use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page store implementations
///
/// Writes that the crawl path performs concurrently must each be a single
/// atomic store operation. In particular `increment_backlink` never reads the
/// counter back into the caller before writing it.
pub trait PageStore {
    // ===== Page Writes =====

    /// Creates or refreshes the content of a page
    ///
    /// Sets title, description, content and `last_crawled`, and marks the page
    /// crawled. The backlink counter is left exactly as it was (0 for a brand
    /// new row).
    fn upsert_content(
        &mut self,
        url: &Url,
        content: &PageContent,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Atomically adds one backlink to `url`, creating a stub row if needed
    ///
    /// # Returns
    ///
    /// The counter value after the increment
    fn increment_backlink(&mut self, url: &Url) -> StorageResult<u64>;

    // ===== Page Reads =====

    /// Gets a page by its normalized URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Finds pages matching any of `terms` (lowercase), best first
    ///
    /// Ordered by relevance descending, then backlinks descending, then URL.
    fn search_pages(&self, terms: &[String], limit: u32, skip: u64)
        -> StorageResult<Vec<ScoredPage>>;

    /// Counts the pages `search_pages` would match with no limit
    fn count_matches(&self, terms: &[String]) -> StorageResult<u64>;

    /// Gets the pages with the most backlinks
    fn top_by_backlinks(&self, limit: u32) -> StorageResult<Vec<PageRecord>>;

    /// Finds crawled pages whose title contains `fragment` (lowercase)
    ///
    /// Pages whose URL is in `exclude` are skipped without consuming `limit`.
    fn suggest_titles(
        &self,
        fragment: &str,
        limit: u32,
        exclude: &[String],
    ) -> StorageResult<Vec<PageRecord>>;

    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state
    fn create_run(&mut self, seed_url: &str, max_depth: u32, config_hash: &str)
        -> StorageResult<i64>;

    /// Records the outcome of a crawl run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_crawled: u64,
        pages_failed: u64,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Statistics =====

    /// Gets total page count
    fn count_total_pages(&self) -> StorageResult<u64>;

    /// Counts pages by state
    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64>;

    /// Sum of all backlink counters
    fn total_backlinks(&self) -> StorageResult<u64>;

    /// Number of distinct hosts seen
    fn count_unique_hosts(&self) -> StorageResult<u64>;

    /// Number of recorded crawl runs
    fn count_runs(&self) -> StorageResult<u64>;
}
