//! Jobtrawl: a quota-bounded job listing crawler
//!
//! This crate crawls a dynamically rendered, paginated job-listing site through a
//! browser session, extracts structured listings from noisy result cards, and
//! persists only novel listings into a SQLite store.

pub mod config;
pub mod crawler;
pub mod session;
pub mod storage;

use thiserror::Error;

/// Main error type for Jobtrawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Jobtrawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, Credentials, SearchFilters};
pub use crawler::{JobSearch, SearchOutcome, StopHandle, StopReason};
pub use session::{BrowserSession, HtmlSession, PageElement, WebDriverSession};
pub use storage::{JobRecord, JobStatus, JobStore, ListingCandidate, SqliteStore};
