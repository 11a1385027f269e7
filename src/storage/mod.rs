//! Storage module for persisting job listings
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Novelty checks by listing URL and by (title, company, location)
//! - Idempotent inserts and duplicate compaction
//! - Search run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{JobStore, StorageError, StorageResult};

use crate::TrawlError;
use std::path::Path;

/// Initializes or opens a job store
pub fn open_store(path: &Path) -> Result<SqliteStore, TrawlError> {
    SqliteStore::new(path)
}

/// A listing extracted from a result card, not yet persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingCandidate {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub posted_date: Option<String>,
    pub description: String,
    pub application_url: String,
    pub salary_range: String,
    pub experience_level: String,
    pub employment_type: String,
}

impl ListingCandidate {
    /// Creates a candidate with the card-level fields; detail fields start empty
    pub fn new(title: &str, company: &str, location: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }
}

/// A persisted job listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub application_url: String,
    pub description: String,
    pub salary_range: String,
    pub experience_level: String,
    pub employment_type: String,
    pub posted_date: Option<String>,
    pub scraped_at: String,
    pub applied: bool,
    pub applied_at: Option<String>,
    pub status: JobStatus,
}

/// Lifecycle status of a persisted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Found,
    Applied,
}

impl JobStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::Applied => "applied",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "found" => Some(Self::Found),
            "applied" => Some(Self::Applied),
            _ => None,
        }
    }
}

/// Represents one search run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub stop_reason: Option<String>,
    pub pages_processed: u32,
    pub saved: u32,
}

/// Status of a search run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
