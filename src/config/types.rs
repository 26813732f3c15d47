use serde::Deserialize;

/// Main configuration structure for Ripple-Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of hops followed from a seed URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of pages fetched concurrently within one crawl
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Per-request deadline (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Seconds between scheduled re-crawls of the seed list (0 = boot only)
    #[serde(rename = "recrawl-interval-secs", default)]
    pub recrawl_interval_secs: u64,

    /// Seed URLs crawled by the scheduler
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Search presentation settings
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(rename = "default-page-size", default = "default_page_size")]
    pub default_page_size: u32,

    /// Characters of context kept on each side of the first term hit
    #[serde(rename = "snippet-radius", default = "default_snippet_radius")]
    pub snippet_radius: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            snippet_radius: default_snippet_radius(),
        }
    }
}

impl Config {
    /// Builds a configuration with default settings around the given database
    pub fn default_for(database_path: &str) -> Self {
        Self {
            crawler: CrawlerConfig {
                max_depth: 2,
                workers: default_workers(),
                fetch_timeout_ms: default_fetch_timeout_ms(),
                recrawl_interval_secs: 0,
                seeds: Vec::new(),
            },
            user_agent: UserAgentConfig {
                crawler_name: "RippleSearch".to_string(),
                crawler_version: env!("CARGO_PKG_VERSION").to_string(),
                contact_url: "https://github.com/ripple-search/ripple-search".to_string(),
            },
            storage: StorageConfig {
                database_path: database_path.to_string(),
            },
            search: SearchConfig::default(),
        }
    }
}

fn default_workers() -> u32 {
    4
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_page_size() -> u32 {
    10
}

fn default_snippet_radius() -> usize {
    90
}
