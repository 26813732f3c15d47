//! Output module for statistics and reports
//!
//! This module handles:
//! - Loading and printing store statistics
//! - Rendering markdown reports of the most linked pages

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{load_statistics, print_statistics, StoreStatistics};

use crate::storage::PageStore;
use crate::RippleError;
use std::path::Path;

/// Writes a markdown report of the store to `output_path`
///
/// # Arguments
///
/// * `storage` - The storage backend containing crawl data
/// * `top_limit` - How many of the most linked pages to list
/// * `output_path` - Where the markdown file is written
pub fn generate_markdown_report(
    storage: &dyn PageStore,
    top_limit: u32,
    output_path: &Path,
) -> Result<(), RippleError> {
    let stats = load_statistics(storage)?;
    let top_pages = storage.top_by_backlinks(top_limit)?;

    let markdown = format_markdown_report(&stats, &top_pages);
    write_markdown_report(&markdown, output_path)?;

    tracing::info!(
        "Wrote report of {} pages to {}",
        top_pages.len(),
        output_path.display()
    );
    Ok(())
}
