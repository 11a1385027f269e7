//! Storage traits and error types
//!
//! This module defines the trait interface for job stores and associated
//! error types.

use crate::storage::{JobRecord, ListingCandidate, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for job store implementations
///
/// Inserts and duplicate deletion must each be atomic per record: a reader
/// never observes a partially written job.
pub trait JobStore {
    // ===== Novelty =====

    /// Returns true if a job with this listing URL is stored
    fn exists(&self, url: &str) -> StorageResult<bool>;

    /// Returns true if a job with this (title, company, location) triple is stored
    fn exists_by_triple(&self, title: &str, company: &str, location: &str)
        -> StorageResult<bool>;

    // ===== Jobs =====

    /// Inserts a candidate as a new job
    ///
    /// # Returns
    ///
    /// * `Ok(Some(JobRecord))` - The committed record
    /// * `Ok(None)` - The listing URL is already stored (uniqueness violation)
    fn insert(&mut self, candidate: &ListingCandidate) -> StorageResult<Option<JobRecord>>;

    /// Gets a job by ID
    fn get(&self, id: i64) -> StorageResult<Option<JobRecord>>;

    /// All jobs, most recently scraped first
    fn list_all(&self) -> StorageResult<Vec<JobRecord>>;

    /// Total number of stored jobs
    fn count(&self) -> StorageResult<u64>;

    /// Marks a job as applied. Returns false when no job has this ID.
    fn mark_applied(&mut self, id: i64) -> StorageResult<bool>;

    /// Removes every job sharing a (title, company, location) triple except
    /// the one with the lowest ID
    ///
    /// Returns the number of jobs removed. A second call removes nothing.
    fn compact_duplicates(&mut self) -> StorageResult<usize>;

    // ===== Run Management =====

    /// Creates a new search run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Records the outcome of a search run
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        stop_reason: &str,
        pages_processed: u32,
        saved: u32,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs first
    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;
}
