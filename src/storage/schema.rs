//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Jobtrawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Persisted job listings. The listing URL is the storage identity; the
-- (title, company, location) triple is checked before insert.
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_title TEXT NOT NULL,
    company_name TEXT NOT NULL,
    location TEXT NOT NULL DEFAULT '',
    job_url TEXT NOT NULL UNIQUE,
    application_url TEXT NOT NULL DEFAULT '',
    job_description TEXT NOT NULL DEFAULT '',
    salary_range TEXT NOT NULL DEFAULT '',
    experience_level TEXT NOT NULL DEFAULT '',
    employment_type TEXT NOT NULL DEFAULT '',
    posted_date TEXT,
    scraped_at TEXT NOT NULL,
    applied INTEGER NOT NULL DEFAULT 0,
    applied_at TEXT,
    status TEXT NOT NULL DEFAULT 'found' CHECK (status IN ('found', 'applied'))
);

CREATE INDEX IF NOT EXISTS idx_jobs_triple ON jobs(job_title, company_name, location);
CREATE INDEX IF NOT EXISTS idx_jobs_scraped ON jobs(scraped_at);

-- Track search runs
CREATE TABLE IF NOT EXISTS search_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    stop_reason TEXT,
    pages_processed INTEGER NOT NULL DEFAULT 0,
    saved_count INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
