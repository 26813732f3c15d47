//! Search module for ranked lookup over stored pages
//!
//! This module answers the read side of the engine:
//! - Paginated term search ranked by relevance, then backlinks
//! - Autosuggest with title backfill
//! - Top pages by backlink count
//! - Escaped, highlighted snippets

mod engine;
mod snippet;
mod types;

pub use engine::{clamp_limit, tokenize, SearchEngine, MAX_PAGE_SIZE, MAX_QUERY_TERMS};
pub use snippet::{escape_html, make_snippet, Highlighter, ELLIPSIS};
pub use types::{SearchHit, SearchResponse, Suggestion};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced to search callers
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}
