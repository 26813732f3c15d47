//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::state::PageState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::{PageBody, PageContent, PageRecord, RunRecord, RunStatus, ScoredPage};
use crate::url::host_key;
use crate::RippleError;
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use url::Url;

/// Columns selected for every page read, in the order `page_from_row` expects
const PAGE_COLUMNS: &str =
    "url, host, backlinks, first_seen, state, title, description, content, last_crawled";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database file at `path`
    pub fn new(path: &Path) -> Result<Self, RippleError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, RippleError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Builds the relevance expression for `term_count` bound terms `?1..?n`
///
/// Per term: title hit 4, url hit 2, description hit 2, content hit 1.
fn relevance_expr(term_count: usize) -> String {
    (1..=term_count)
        .map(|i| {
            format!(
                "(CASE WHEN instr(lower(COALESCE(title, '')), ?{0}) > 0 THEN 4 ELSE 0 END
                 + CASE WHEN instr(lower(url), ?{0}) > 0 THEN 2 ELSE 0 END
                 + CASE WHEN instr(lower(COALESCE(description, '')), ?{0}) > 0 THEN 2 ELSE 0 END
                 + CASE WHEN instr(lower(COALESCE(content, '')), ?{0}) > 0 THEN 1 ELSE 0 END)",
                i
            )
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn term_values(terms: &[String]) -> Vec<Value> {
    terms.iter().map(|t| Value::Text(t.to_ascii_lowercase())).collect()
}

/// Maps a row selected with `PAGE_COLUMNS` into a page record
fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    let state_str: String = row.get(4)?;
    let state = PageState::from_db_string(&state_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown page state '{}'", state_str).into(),
        )
    })?;

    let backlinks: i64 = row.get(2)?;

    let body = match state {
        PageState::Stub => PageBody::Stub,
        PageState::Crawled => PageBody::Crawled {
            content: PageContent {
                title: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                description: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                content: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            },
            last_crawled: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        },
    };

    Ok(PageRecord {
        url: row.get(0)?,
        host: row.get(1)?,
        backlinks: backlinks.max(0) as u64,
        first_seen: row.get(3)?,
        body,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let max_depth: i64 = row.get(2)?;
    let pages_crawled: i64 = row.get(7)?;
    let pages_failed: i64 = row.get(8)?;

    Ok(RunRecord {
        id: row.get(0)?,
        seed_url: row.get(1)?,
        max_depth: max_depth as u32,
        config_hash: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(RunStatus::Failed),
        pages_crawled: pages_crawled as u64,
        pages_failed: pages_failed as u64,
    })
}

fn map_corrupt(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
            StorageError::Corrupt(source.to_string())
        }
        other => StorageError::Sqlite(other),
    }
}

const RUN_COLUMNS: &str = "id, seed_url, max_depth, config_hash, started_at, finished_at, status,
     pages_crawled, pages_failed";

impl PageStore for SqliteStorage {
    // ===== Page Writes =====

    fn upsert_content(
        &mut self,
        url: &Url,
        content: &PageContent,
        crawled_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let now = crawled_at.to_rfc3339();
        let host = host_key(url).unwrap_or_default();

        // The conflict branch must never name `backlinks`
        self.conn.execute(
            "INSERT INTO pages (url, host, state, title, description, content, backlinks,
                                first_seen, last_crawled)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
             ON CONFLICT(url) DO UPDATE SET
                 state = excluded.state,
                 title = excluded.title,
                 description = excluded.description,
                 content = excluded.content,
                 last_crawled = excluded.last_crawled",
            params![
                url.as_str(),
                host,
                PageState::Crawled.to_db_string(),
                content.title,
                content.description,
                content.content,
                now
            ],
        )?;
        Ok(())
    }

    fn increment_backlink(&mut self, url: &Url) -> StorageResult<u64> {
        let now = Utc::now().to_rfc3339();
        let host = host_key(url).unwrap_or_default();

        let count: i64 = self.conn.query_row(
            "INSERT INTO pages (url, host, state, backlinks, first_seen)
             VALUES (?1, ?2, ?3, 1, ?4)
             ON CONFLICT(url) DO UPDATE SET backlinks = backlinks + 1
             RETURNING backlinks",
            params![url.as_str(), host, PageState::Stub.to_db_string(), now],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Page Reads =====

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let sql = format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS);
        self.conn
            .query_row(&sql, params![url], page_from_row)
            .optional()
            .map_err(map_corrupt)
    }

    fn search_pages(
        &self,
        terms: &[String],
        limit: u32,
        skip: u64,
    ) -> StorageResult<Vec<ScoredPage>> {
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let n = terms.len();
        let sql = format!(
            "SELECT {columns}, score FROM (
                 SELECT {columns}, ({expr}) AS score FROM pages
             )
             WHERE score > 0
             ORDER BY score DESC, backlinks DESC, url ASC
             LIMIT ?{limit} OFFSET ?{offset}",
            columns = PAGE_COLUMNS,
            expr = relevance_expr(n),
            limit = n + 1,
            offset = n + 2,
        );

        let mut values = term_values(terms);
        values.push(Value::Integer(i64::from(limit)));
        values.push(Value::Integer(skip.min(i64::MAX as u64) as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                let score: i64 = row.get(9)?;
                Ok(ScoredPage {
                    page: page_from_row(row)?,
                    relevance: score as f64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_corrupt)?;

        Ok(pages)
    }

    fn count_matches(&self, terms: &[String]) -> StorageResult<u64> {
        if terms.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT COUNT(*) FROM pages WHERE ({}) > 0",
            relevance_expr(terms.len())
        );
        let count: i64 = self.conn.query_row(
            &sql,
            params_from_iter(term_values(terms).iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn top_by_backlinks(&self, limit: u32) -> StorageResult<Vec<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM pages ORDER BY backlinks DESC, url ASC LIMIT ?1",
            PAGE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(params![i64::from(limit)], page_from_row)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_corrupt)?;
        Ok(pages)
    }

    fn suggest_titles(
        &self,
        fragment: &str,
        limit: u32,
        exclude: &[String],
    ) -> StorageResult<Vec<PageRecord>> {
        if fragment.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        // Over-fetch so excluded rows do not eat into the limit
        let fetch = i64::from(limit) + exclude.len() as i64;
        let sql = format!(
            "SELECT {} FROM pages
             WHERE state = ?1 AND instr(lower(COALESCE(title, '')), ?2) > 0
             ORDER BY backlinks DESC, url ASC
             LIMIT ?3",
            PAGE_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let pages = stmt
            .query_map(
                params![
                    PageState::Crawled.to_db_string(),
                    fragment.to_ascii_lowercase(),
                    fetch
                ],
                page_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_corrupt)?;

        Ok(pages
            .into_iter()
            .filter(|page| !exclude.contains(&page.url))
            .take(limit as usize)
            .collect())
    }

    // ===== Run Management =====

    fn create_run(
        &mut self,
        seed_url: &str,
        max_depth: u32,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (seed_url, max_depth, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                seed_url,
                max_depth,
                config_hash,
                now,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_crawled: u64,
        pages_failed: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages_crawled = ?3, pages_failed = ?4
             WHERE id = ?5",
            params![
                status.to_db_string(),
                now,
                pages_crawled as i64,
                pages_failed as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&sql, [], run_from_row).optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    fn count_total_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn total_backlinks(&self) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(backlinks), 0) FROM pages",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    fn count_unique_hosts(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT host) FROM pages", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
