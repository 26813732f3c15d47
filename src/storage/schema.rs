//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Ripple-Search database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per known URL, stub or crawled
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    host TEXT NOT NULL,
    state TEXT NOT NULL,
    title TEXT,
    description TEXT,
    content TEXT,
    backlinks INTEGER NOT NULL DEFAULT 0 CHECK (backlinks >= 0),
    first_seen TEXT NOT NULL,
    last_crawled TEXT
);

CREATE INDEX IF NOT EXISTS idx_pages_backlinks ON pages(backlinks DESC);
CREATE INDEX IF NOT EXISTS idx_pages_host ON pages(host);
CREATE INDEX IF NOT EXISTS idx_pages_state ON pages(state);

-- Bookkeeping for crawl invocations
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_url TEXT NOT NULL,
    max_depth INTEGER NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    pages_crawled INTEGER NOT NULL DEFAULT 0,
    pages_failed INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database; every statement is `IF NOT EXISTS`.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
