//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StorageError, StorageResult};
use crate::storage::{JobRecord, JobStatus, ListingCandidate, RunRecord, RunStatus};
use crate::TrawlError;
use chrono::Utc;
use rusqlite::{ffi, params, Connection, OptionalExtension};
use std::path::Path;

const JOB_COLUMNS: &str = "id, job_title, company_name, location, job_url, application_url,
     job_description, salary_range, experience_level, employment_type, posted_date,
     scraped_at, applied, applied_at, status";

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, stop_reason, pages_processed, saved_count";

/// SQLite job store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and initializes the schema
    pub fn new(path: &Path) -> Result<Self, TrawlError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, TrawlError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
        Ok(JobRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            location: row.get(3)?,
            url: row.get(4)?,
            application_url: row.get(5)?,
            description: row.get(6)?,
            salary_range: row.get(7)?,
            experience_level: row.get(8)?,
            employment_type: row.get(9)?,
            posted_date: row.get(10)?,
            scraped_at: row.get(11)?,
            applied: row.get(12)?,
            applied_at: row.get(13)?,
            status: JobStatus::from_db_string(&row.get::<_, String>(14)?)
                .unwrap_or(JobStatus::Found),
        })
    }

    fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Failed),
            stop_reason: row.get(5)?,
            pages_processed: row.get(6)?,
            saved: row.get(7)?,
        })
    }
}

impl JobStore for SqliteStore {
    // ===== Novelty =====

    fn exists(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM jobs WHERE job_url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn exists_by_triple(
        &self,
        title: &str,
        company: &str,
        location: &str,
    ) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM jobs WHERE job_title = ?1 AND company_name = ?2 AND location = ?3
                 LIMIT 1",
                params![title, company, location],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ===== Jobs =====

    fn insert(&mut self, candidate: &ListingCandidate) -> StorageResult<Option<JobRecord>> {
        let now = Utc::now().to_rfc3339();
        let result = self.conn.execute(
            "INSERT INTO jobs (job_title, company_name, location, job_url, application_url,
             job_description, salary_range, experience_level, employment_type, posted_date,
             scraped_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                candidate.title,
                candidate.company,
                candidate.location,
                candidate.url,
                candidate.application_url,
                candidate.description,
                candidate.salary_range,
                candidate.experience_level,
                candidate.employment_type,
                candidate.posted_date,
                now,
                JobStatus::Found.to_db_string(),
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                self.get(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                tracing::debug!("Insert rejected, listing URL already stored: {}", candidate.url);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: i64) -> StorageResult<Option<JobRecord>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);
        let job = self
            .conn
            .query_row(&sql, params![id], Self::row_to_job)
            .optional()?;
        Ok(job)
    }

    fn list_all(&self) -> StorageResult<Vec<JobRecord>> {
        let sql = format!(
            "SELECT {} FROM jobs ORDER BY scraped_at DESC, id DESC",
            JOB_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map([], Self::row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn mark_applied(&mut self, id: i64) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE jobs SET applied = 1, applied_at = ?1, status = ?2 WHERE id = ?3",
            params![now, JobStatus::Applied.to_db_string(), id],
        )?;
        Ok(updated > 0)
    }

    fn compact_duplicates(&mut self) -> StorageResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM jobs
             WHERE id NOT IN (
                 SELECT MIN(id) FROM jobs GROUP BY job_title, company_name, location
             )",
            [],
        )?;
        Ok(removed)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO search_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        stop_reason: &str,
        pages_processed: u32,
        saved: u32,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE search_runs SET status = ?1, finished_at = ?2, stop_reason = ?3,
             pages_processed = ?4, saved_count = ?5 WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                stop_reason,
                pages_processed,
                saved,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM search_runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], Self::row_to_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM search_runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit as i64], Self::row_to_run)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
