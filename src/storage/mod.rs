//! Storage module for persisting pages and crawl runs
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Page content upserts and atomic backlink increments
//! - Term search with a store-computed relevance score
//! - Crawl run bookkeeping and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PageStore, StorageError, StorageResult};

use crate::state::PageState;

/// Extracted page content written by the crawl path
///
/// Carries no backlink field; content upserts never touch the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub description: String,
    pub content: String,
}

/// What the store knows about a page beyond its identity
#[derive(Debug, Clone, PartialEq)]
pub enum PageBody {
    /// Known only as a link target
    Stub,

    /// Fetched at least once
    Crawled {
        content: PageContent,
        last_crawled: String,
    },
}

/// Represents a page in the database
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: String,
    pub host: String,
    pub backlinks: u64,
    pub first_seen: String,
    pub body: PageBody,
}

impl PageRecord {
    pub fn state(&self) -> PageState {
        match self.body {
            PageBody::Stub => PageState::Stub,
            PageBody::Crawled { .. } => PageState::Crawled,
        }
    }

    /// Display title; stubs and untitled pages fall back to the URL
    pub fn title(&self) -> &str {
        match &self.body {
            PageBody::Crawled { content, .. } if !content.title.is_empty() => &content.title,
            _ => &self.url,
        }
    }

    pub fn description(&self) -> &str {
        match &self.body {
            PageBody::Crawled { content, .. } => &content.description,
            PageBody::Stub => "",
        }
    }

    pub fn content(&self) -> &str {
        match &self.body {
            PageBody::Crawled { content, .. } => &content.content,
            PageBody::Stub => "",
        }
    }

    pub fn last_crawled(&self) -> Option<&str> {
        match &self.body {
            PageBody::Crawled { last_crawled, .. } => Some(last_crawled),
            PageBody::Stub => None,
        }
    }
}

/// A page returned by term search together with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPage {
    pub page: PageRecord,
    pub relevance: f64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub seed_url: String,
    pub max_depth: u32,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub pages_crawled: u64,
    pub pages_failed: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
