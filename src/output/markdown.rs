//! Markdown report generation
//!
//! This module renders a human-readable report of the store: statistics,
//! the latest crawl run and the most linked pages.

use crate::output::stats::StoreStatistics;
use crate::state::PageState;
use crate::storage::PageRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a rendered report to `output_path`
pub fn write_markdown_report(markdown: &str, output_path: &Path) -> std::io::Result<()> {
    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;
    Ok(())
}

/// Formats store statistics and the top pages as markdown
pub fn format_markdown_report(stats: &StoreStatistics, top_pages: &[PageRecord]) -> String {
    let mut md = String::new();

    md.push_str("# Ripple-Search Report\n\n");

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Pages**: {}\n", stats.total_pages));
    md.push_str(&format!(
        "- **Crawled Pages**: {} ({:.2}%)\n",
        stats.pages_in_state(PageState::Crawled),
        stats.crawled_ratio()
    ));
    md.push_str(&format!(
        "- **Stub Pages**: {}\n",
        stats.pages_in_state(PageState::Stub)
    ));
    md.push_str(&format!("- **Unique Hosts**: {}\n", stats.unique_hosts));
    md.push_str(&format!(
        "- **Total Backlinks**: {}\n",
        stats.total_backlinks
    ));
    md.push_str(&format!("- **Crawl Runs**: {}\n\n", stats.total_runs));

    if let Some(run) = &stats.latest_run {
        md.push_str("## Latest Run\n\n");
        md.push_str(&format!("- **Run ID**: {}\n", run.id));
        md.push_str(&format!("- **Seed**: {}\n", run.seed_url));
        md.push_str(&format!("- **Max Depth**: {}\n", run.max_depth));
        md.push_str(&format!("- **Started**: {}\n", run.started_at));
        if let Some(finished) = &run.finished_at {
            md.push_str(&format!("- **Finished**: {}\n", finished));
        }
        md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
        md.push_str(&format!(
            "- **Pages**: {} crawled, {} failed\n",
            run.pages_crawled, run.pages_failed
        ));
        if !run.config_hash.is_empty() {
            md.push_str(&format!("- **Config Hash**: {}\n", run.config_hash));
        }
        md.push('\n');
    }

    md.push_str("## Top Pages by Backlinks\n\n");
    if top_pages.is_empty() {
        md.push_str("_No pages recorded yet._\n");
        return md;
    }

    md.push_str("| # | Backlinks | State | Page |\n");
    md.push_str("|---|-----------|-------|------|\n");
    for (rank, page) in top_pages.iter().enumerate() {
        md.push_str(&format!(
            "| {} | {} | {} | [{}]({}) |\n",
            rank + 1,
            page.backlinks,
            page.state(),
            escape_table_text(page.title()),
            page.url
        ));
    }

    md
}

/// Keeps titles from breaking table cells or link text
fn escape_table_text(text: &str) -> String {
    text.replace('|', "\\|")
        .replace('[', "\\[")
        .replace(']', "\\]")
}
