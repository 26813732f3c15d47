use serde::Serialize;

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    /// Escaped title with query terms in `<mark>`
    pub title_html: String,
    /// Escaped content excerpt with query terms in `<mark>`
    pub snippet_html: String,
    pub description: String,
    pub backlinks: u64,
    /// Store-computed relevance
    pub score: f64,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Matches across all pages
    pub total: u64,
    /// 1-based page number actually served
    pub page: u64,
    /// Number of pages at the served page size
    pub pages: u64,
    pub query: String,
}

impl SearchResponse {
    pub fn empty(query: &str) -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            page: 1,
            pages: 0,
            query: query.to_string(),
        }
    }
}

/// An autosuggest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub title: String,
    pub url: String,
    pub title_html: String,
}
