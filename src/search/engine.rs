//! Search/rank engine over a shared page store

use crate::config::SearchConfig;
use crate::search::snippet::{make_snippet, Highlighter};
use crate::search::types::{SearchHit, SearchResponse, Suggestion};
use crate::search::SearchError;
use crate::storage::{PageRecord, PageStore, ScoredPage};
use std::sync::{Arc, Mutex, MutexGuard};

/// Upper bound for page sizes and list limits
pub const MAX_PAGE_SIZE: u32 = 50;

/// Terms beyond this many are ignored
pub const MAX_QUERY_TERMS: usize = 16;

/// Shortest title prefix tried when backfilling suggestions
const MIN_BACKFILL_PREFIX: usize = 3;

/// Splits a query into unique lowercase terms in first-seen order
///
/// Lowercasing is ASCII-only, matching SQLite's `lower()`.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split_whitespace() {
        let term = word.to_ascii_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
        if terms.len() == MAX_QUERY_TERMS {
            break;
        }
    }
    terms
}

/// Clamps a requested size into `[1, MAX_PAGE_SIZE]`
pub fn clamp_limit(requested: i64) -> u32 {
    requested.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32
}

/// Answers search, suggest and top queries
///
/// The engine only reads; it shares the store with running crawls and sees
/// their writes as they land.
pub struct SearchEngine<S> {
    storage: Arc<Mutex<S>>,
    default_page_size: u32,
    snippet_radius: usize,
}

impl<S> Clone for SearchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            default_page_size: self.default_page_size,
            snippet_radius: self.snippet_radius,
        }
    }
}

impl<S: PageStore> SearchEngine<S> {
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self::with_config(storage, &SearchConfig::default())
    }

    pub fn with_config(storage: Arc<Mutex<S>>, config: &SearchConfig) -> Self {
        Self {
            storage,
            default_page_size: config.default_page_size,
            snippet_radius: config.snippet_radius,
        }
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    /// Runs a ranked, paginated term search
    ///
    /// `page` is 1-based and clamped to at least 1; `page_size` is clamped
    /// to `[1, 50]`. An empty query returns an empty response without
    /// touching the store.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ripple_search::search::SearchEngine;
    /// use ripple_search::storage::SqliteStorage;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
    /// let engine = SearchEngine::new(storage);
    /// let response = engine.search("rust async", 1, 10).unwrap();
    /// for hit in response.results {
    ///     println!("{} ({} backlinks)", hit.title, hit.backlinks);
    /// }
    /// ```
    pub fn search(
        &self,
        query: &str,
        page: i64,
        page_size: i64,
    ) -> Result<SearchResponse, SearchError> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(SearchResponse::empty(query));
        }

        let page_size = clamp_limit(page_size);
        let page = page.max(1) as u64;
        let skip = (page - 1).saturating_mul(u64::from(page_size));

        let (total, matches) = {
            let storage = self.lock()?;
            let total = storage.count_matches(&terms)?;
            let matches = storage.search_pages(&terms, page_size, skip)?;
            (total, matches)
        };

        tracing::debug!(
            "Search {:?}: {} matches, serving page {} ({} results)",
            terms,
            total,
            page,
            matches.len()
        );

        let highlighter = Highlighter::new(&terms);
        let results = matches
            .into_iter()
            .map(|scored| self.to_hit(scored, &highlighter))
            .collect();

        let page_size = u64::from(page_size);
        Ok(SearchResponse {
            results,
            total,
            page,
            pages: (total + page_size - 1) / page_size,
            query: query.to_string(),
        })
    }

    /// Suggests pages for a partially typed query
    ///
    /// Ranked term matches come first. If there are fewer than `limit`, the
    /// list is backfilled with crawled pages whose title contains a term or a
    /// shrinking prefix of one (longest term first), most linked first.
    pub fn suggest(&self, query: &str, limit: i64) -> Result<Vec<Suggestion>, SearchError> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let limit = clamp_limit(limit);
        let storage = self.lock()?;

        let highlighter = Highlighter::new(&terms);
        let mut suggestions: Vec<Suggestion> = storage
            .search_pages(&terms, limit, 0)?
            .into_iter()
            .map(|scored| to_suggestion(&scored.page, &highlighter))
            .collect();

        for fragment in backfill_fragments(&terms) {
            let remaining = limit.saturating_sub(suggestions.len() as u32);
            if remaining == 0 {
                break;
            }

            let exclude: Vec<String> = suggestions.iter().map(|s| s.url.clone()).collect();
            let fragment_highlighter = Highlighter::new(&[fragment.as_str()]);
            suggestions.extend(
                storage
                    .suggest_titles(&fragment, remaining, &exclude)?
                    .iter()
                    .map(|page| to_suggestion(page, &fragment_highlighter)),
            );
        }

        Ok(suggestions)
    }

    /// Lists the most linked pages, most backlinks first
    pub fn top(&self, limit: i64) -> Result<Vec<PageRecord>, SearchError> {
        let storage = self.lock()?;
        Ok(storage.top_by_backlinks(clamp_limit(limit))?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>, SearchError> {
        self.storage.lock().map_err(|_| SearchError::LockPoisoned)
    }

    fn to_hit(&self, scored: ScoredPage, highlighter: &Highlighter) -> SearchHit {
        let ScoredPage { page, relevance } = scored;

        // Stubs have no content; fall back to the description
        let excerpt_source = if page.content().is_empty() {
            page.description()
        } else {
            page.content()
        };

        SearchHit {
            title: page.title().to_string(),
            title_html: highlighter.highlight(page.title()),
            snippet_html: make_snippet(excerpt_source, highlighter, self.snippet_radius),
            description: page.description().to_string(),
            backlinks: page.backlinks,
            score: relevance,
            url: page.url,
        }
    }
}

fn to_suggestion(page: &PageRecord, highlighter: &Highlighter) -> Suggestion {
    Suggestion {
        title: page.title().to_string(),
        url: page.url.clone(),
        title_html: highlighter.highlight(page.title()),
    }
}

/// Title fragments for backfill: each term, then its shorter prefixes
///
/// Longest terms come first; no prefix is shorter than three characters
/// unless the term itself is.
fn backfill_fragments(terms: &[String]) -> Vec<String> {
    let mut by_length: Vec<&String> = terms.iter().collect();
    by_length.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    let mut fragments: Vec<String> = Vec::new();
    for term in by_length {
        let chars: Vec<char> = term.chars().collect();
        let shortest = MIN_BACKFILL_PREFIX.min(chars.len());
        for len in (shortest..=chars.len()).rev() {
            let fragment: String = chars[..len].iter().collect();
            if !fragments.contains(&fragment) {
                fragments.push(fragment);
            }
        }
    }
    fragments
}
