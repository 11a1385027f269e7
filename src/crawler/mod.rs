//! Crawler module for job search and persistence
//!
//! This module contains the core search pipeline, including:
//! - Login through the site's form with bounded polling
//! - Listing extraction with selector fallback and token classification
//! - Detail enrichment for novel listings
//! - Novelty checks and incremental persistence
//! - Pagination with quota, page cap and fault recovery

mod auth;
mod coordinator;
mod enricher;
mod extractor;
mod persist;
mod poll;
mod search_url;

pub use auth::{is_challenge, Authenticator, LoginOutcome};
pub use coordinator::{JobSearch, SearchOutcome, SearchSession, StopHandle, StopReason};
pub use enricher::{DetailEnricher, JobDetails};
pub use extractor::{
    classify_tokens, first_success, is_location_token, Classified, ListingExtractor, Read,
    Strategy, Title, CARD_SELECTORS,
};
pub use persist::{compact_duplicates, find_duplicate, BatchResult, Duplicate, PersistStats, Persister};
pub use poll::{poll_until, PollOutcome, PollPolicy, Probe};
pub use search_url::build_search_url;

use crate::config::{Config, Credentials, SearchFilters};
use crate::session::WebDriverSession;
use crate::storage::open_store;
use crate::TrawlError;
use std::path::Path;

/// Runs a complete search against the live site
///
/// This is the main entry point for a search. It will:
/// 1. Open the job store
/// 2. Acquire a WebDriver session
/// 3. Log in with the given credentials
/// 4. Crawl result pages until a stop condition holds
/// 5. Close the session
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `filters` - Search filters for this run
/// * `credentials` - Login credentials
/// * `config_hash` - Digest of the config file, recorded with the run
/// * `stop` - Cancellation handle checked between pages
///
/// # Returns
///
/// * `Ok(SearchOutcome)` - The search ran; see its stop reason
/// * `Err(TrawlError)` - The store could not be opened or no session could be acquired
pub async fn run_search(
    config: &Config,
    filters: &SearchFilters,
    credentials: &Credentials,
    config_hash: &str,
    stop: Option<&StopHandle>,
) -> Result<SearchOutcome, TrawlError> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let session = WebDriverSession::connect(&config.browser).await?;

    let mut search = JobSearch::new(session, store, config)?.with_config_hash(config_hash);
    if let Some(stop) = stop {
        search = search.with_stop_handle(stop.clone());
    }

    Ok(search.run(Some(credentials), filters).await)
}
