//! Ripple-Search main entry point
//!
//! This is the command-line interface for the Ripple-Search engine.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ripple_search::config::{load_config_with_hash, Config, MAX_CONFIG_DEPTH};
use ripple_search::crawler::{Crawler, Scheduler};
use ripple_search::output::{generate_markdown_report, load_statistics, print_statistics};
use ripple_search::search::SearchEngine;
use ripple_search::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Database used when neither a config file nor --database names one
const DEFAULT_DATABASE_PATH: &str = "./ripple.db";

/// Ripple-Search: a backlink-weighted web search engine
///
/// Ripple-Search crawls pages from a seed URL, counts how often each page is
/// linked to, and answers keyword searches ranked by relevance and backlinks.
#[derive(Parser, Debug)]
#[command(name = "ripple-search")]
#[command(version)]
#[command(about = "A backlink-weighted web search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the config file)
    #[arg(short, long, value_name = "PATH", global = true)]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from a seed URL and record backlinks
    Crawl {
        /// Seed URL (http or https)
        url: String,

        /// Maximum link hops from the seed (defaults to the config value)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=MAX_CONFIG_DEPTH as i64))]
        depth: Option<u32>,
    },

    /// Search stored pages
    Search {
        /// Query terms
        #[arg(required = true)]
        query: Vec<String>,

        /// Result page (1-based)
        #[arg(long, default_value_t = 1)]
        page: i64,

        /// Results per page (1-50, defaults to the config value)
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Suggest pages for a partial query
    Suggest {
        #[arg(required = true)]
        query: Vec<String>,

        #[arg(long, default_value_t = 5)]
        limit: i64,
    },

    /// List the most linked pages
    Top {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Crawl the configured seeds on boot and on the re-crawl interval until Ctrl-C
    Serve,

    /// Show statistics from the database
    Stats,

    /// Write a markdown report of the store
    Export {
        /// Output markdown file
        path: PathBuf,

        /// Number of top pages listed
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_settings(cli.config.as_deref(), cli.database.as_deref())?;

    match cli.command {
        Command::Crawl { url, depth } => handle_crawl(&config, &config_hash, &url, depth).await,
        Command::Search { query, page, limit } => {
            handle_search(&config, &query.join(" "), page, limit)
        }
        Command::Suggest { query, limit } => handle_suggest(&config, &query.join(" "), limit),
        Command::Top { limit } => handle_top(&config, limit),
        Command::Serve => handle_serve(&config, &config_hash).await,
        Command::Stats => handle_stats(&config),
        Command::Export { path, limit } => handle_export(&config, &path, limit),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_search=info,warn"),
            1 => EnvFilter::new("ripple_search=debug,info"),
            2 => EnvFilter::new("ripple_search=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file if given, then applies the --database override
fn load_settings(
    config_path: Option<&Path>,
    database: Option<&Path>,
) -> anyhow::Result<(Config, String)> {
    let (mut config, config_hash) = match config_path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => (Config::default_for(DEFAULT_DATABASE_PATH), String::new()),
    };

    if let Some(database) = database {
        config.storage.database_path = database.display().to_string();
    }

    Ok((config, config_hash))
}

fn open_shared_storage(config: &Config) -> anyhow::Result<Arc<Mutex<SqliteStorage>>> {
    let path = Path::new(&config.storage.database_path);
    let storage = SqliteStorage::new(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// Handles the crawl command: one crawl from the given seed
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    url: &str,
    depth: Option<u32>,
) -> anyhow::Result<()> {
    let storage = open_shared_storage(config)?;
    let crawler = Crawler::new(config, storage)?.with_config_hash(config_hash);
    let max_depth = depth.unwrap_or(config.crawler.max_depth);

    let report = crawler
        .crawl(url, max_depth)
        .await
        .with_context(|| format!("Crawl of {} failed", url))?;

    println!("=== Crawl Complete ===\n");
    println!("Seed: {}", report.seed_url);
    if let Some(run_id) = report.run_id {
        println!("Run ID: {}", run_id);
    }
    println!("Pages crawled: {}", report.pages_crawled);
    println!("Pages failed: {}", report.pages_failed);
    println!("Links recorded: {}", report.links_recorded);
    println!("Elapsed: {:.2?}", report.elapsed);

    Ok(())
}

/// Handles the search command: prints one page of ranked results
fn handle_search(config: &Config, query: &str, page: i64, limit: Option<i64>) -> anyhow::Result<()> {
    let engine = SearchEngine::with_config(open_shared_storage(config)?, &config.search);
    let page_size = limit.unwrap_or_else(|| i64::from(engine.default_page_size()));

    let response = engine.search(query, page, page_size)?;

    println!(
        "{} results for \"{}\" (page {} of {})\n",
        response.total,
        response.query,
        response.page,
        response.pages.max(1)
    );
    for hit in &response.results {
        println!("{}", hit.title);
        println!("  {}", hit.url);
        println!("  backlinks: {}, score: {}", hit.backlinks, hit.score);
        if !hit.snippet_html.is_empty() {
            println!("  {}", hit.snippet_html);
        }
        println!();
    }

    Ok(())
}

/// Handles the suggest command
fn handle_suggest(config: &Config, query: &str, limit: i64) -> anyhow::Result<()> {
    let engine = SearchEngine::with_config(open_shared_storage(config)?, &config.search);

    for suggestion in engine.suggest(query, limit)? {
        println!("{}\t{}", suggestion.title, suggestion.url);
    }

    Ok(())
}

/// Handles the top command
fn handle_top(config: &Config, limit: i64) -> anyhow::Result<()> {
    let engine = SearchEngine::with_config(open_shared_storage(config)?, &config.search);

    for (rank, page) in engine.top(limit)?.iter().enumerate() {
        println!(
            "{:>3}. {:>6}  {} ({})",
            rank + 1,
            page.backlinks,
            page.title(),
            page.url
        );
    }

    Ok(())
}

/// Handles the serve command: scheduled crawls until interrupted
async fn handle_serve(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    if config.crawler.seeds.is_empty() {
        bail!("No seeds configured; add `seeds` to the [crawler] section");
    }

    let storage = open_shared_storage(config)?;
    let crawler = Crawler::new(config, storage)?.with_config_hash(config_hash);
    let scheduler = Scheduler::new(crawler, &config.crawler);

    tokio::select! {
        _ = scheduler.run() => {
            tracing::info!("Scheduled crawls finished");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Interrupted, shutting down");
        }
    }

    Ok(())
}

/// Handles the stats command: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the export command: writes a markdown report
fn handle_export(config: &Config, path: &Path, limit: u32) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

    generate_markdown_report(&storage, limit, path)
        .with_context(|| format!("Failed to export report to {}", path.display()))?;

    println!("✓ Report exported to: {}", path.display());
    Ok(())
}
