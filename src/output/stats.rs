//! Statistics generation from the page store
//!
//! This module provides functionality for extracting and displaying
//! store statistics.

use crate::state::PageState;
use crate::storage::{PageStore, RunRecord};
use crate::RippleError;
use std::collections::HashMap;

/// Page store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of page rows (stubs included)
    pub total_pages: u64,

    /// Count of pages by state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Number of unique hosts encountered
    pub unique_hosts: u64,

    /// Sum of every backlink counter
    pub total_backlinks: u64,

    /// Number of crawl runs recorded
    pub total_runs: u64,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl StoreStatistics {
    pub fn pages_in_state(&self, state: PageState) -> u64 {
        self.pages_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Share of known pages whose content has been fetched, in percent
    pub fn crawled_ratio(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.pages_in_state(PageState::Crawled) as f64 / self.total_pages as f64 * 100.0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(RippleError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn PageStore) -> Result<StoreStatistics, RippleError> {
    let mut pages_by_state = HashMap::new();
    for state in PageState::all_states() {
        pages_by_state.insert(state, storage.count_pages_by_state(state)?);
    }

    Ok(StoreStatistics {
        total_pages: storage.count_total_pages()?,
        pages_by_state,
        unique_hosts: storage.count_unique_hosts()?,
        total_backlinks: storage.total_backlinks()?,
        total_runs: storage.count_runs()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Total pages known: {}", stats.total_pages);
    println!("  Unique hosts: {}", stats.unique_hosts);
    println!("  Total backlinks: {}", stats.total_backlinks);
    println!("  Crawl runs: {}", stats.total_runs);
    println!();

    println!("Pages by State:");
    for state in PageState::all_states() {
        let count = stats.pages_in_state(state);
        let percentage = if stats.total_pages > 0 {
            (count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Seed: {} (max depth {})", run.seed_url, run.max_depth);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!(
            "  Pages: {} crawled, {} failed",
            run.pages_crawled, run.pages_failed
        );
    }
}
