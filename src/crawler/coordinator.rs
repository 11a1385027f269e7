//! Search coordinator - the pagination loop
//!
//! [`JobSearch`] owns the browser session and the job store for the length of
//! one search. It walks the result pages in the order the site serves them,
//! hands every card to the extractor, persists each page's candidates as one
//! batch and decides after every page whether to advance or stop.
//!
//! Per-page faults never escape the loop. A failed navigation is retried once
//! against the current page; if that does not produce cards the search stops
//! and returns what it has saved so far.

use crate::config::{Config, Credentials, LoginConfig, SearchConfig, SearchFilters};
use crate::crawler::auth::Authenticator;
use crate::crawler::enricher::DetailEnricher;
use crate::crawler::extractor::{ListingExtractor, CARD_SELECTORS};
use crate::crawler::persist::{PersistStats, Persister};
use crate::crawler::poll::{poll_until, PollOutcome, PollPolicy, Probe};
use crate::crawler::search_url::build_search_url;
use crate::session::{query, BrowserSession, PageElement, SessionResult};
use crate::storage::{JobRecord, JobStore, RunStatus};
use crate::TrawlError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Pagination controls, most specific first
const NEXT_SELECTORS: &[&str] = &[
    "button[aria-label='View next page']",
    "button[aria-label='Next']",
    "button[aria-label='Next page']",
    ".jobs-search-results-list__pagination button:last-child",
    ".pv2 .artdeco-button--secondary",
];

/// Page texts that mark a true end of the result list
const END_MARKERS: &[&str] = &["no more results", "end of results"];

const LOGIN_REDIRECT_MARKERS: &[&str] = &["sign-in", "login"];

const EMPTY_SEARCH_MARKERS: &[&str] = &["no jobs found"];

/// Why a search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The run saved at least its quota
    QuotaReached,
    /// The run processed its page cap
    PageCap,
    /// No next control, and the page says the list has ended
    EndOfResults,
    /// No next control and no end marker
    NoPagination,
    /// A freshly loaded page stayed empty past the grace threshold
    NoMoreCards,
    /// Navigation failed and the retry found no cards
    NavigationFailed,
    /// The first result page had no cards
    NoResults,
    /// Authentication did not succeed
    LoginFailed,
    /// The host requested a stop between pages
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuotaReached => "quota-reached",
            Self::PageCap => "page-cap",
            Self::EndOfResults => "end-of-results",
            Self::NoPagination => "no-pagination",
            Self::NoMoreCards => "no-more-cards",
            Self::NavigationFailed => "navigation-failed",
            Self::NoResults => "no-results",
            Self::LoginFailed => "login-failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Status recorded for a run that stopped for this reason
    pub fn run_status(&self) -> RunStatus {
        match self {
            Self::Cancelled => RunStatus::Cancelled,
            Self::NavigationFailed | Self::LoginFailed => RunStatus::Failed,
            _ => RunStatus::Completed,
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cooperative cancellation flag shared with the host
///
/// The search checks it at the top of every page, so a stop never interrupts
/// a page half way through.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the search to stop before its next page
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// State of one search call; dropped when the call returns
#[derive(Debug)]
pub struct SearchSession<E> {
    pub page_number: u32,
    pub pages_processed: u32,
    pub total_saved: u32,
    /// Cards of the page currently being processed
    pub cards: Vec<E>,
}

impl<E> SearchSession<E> {
    fn new(cards: Vec<E>) -> Self {
        Self {
            page_number: 1,
            pages_processed: 0,
            total_saved: 0,
            cards,
        }
    }
}

/// Result of a search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Records committed during this search, in the order they were saved
    pub saved: Vec<JobRecord>,
    pub page_number: u32,
    pub pages_processed: u32,
    pub total_saved: u32,
    pub stop_reason: StopReason,
    pub stats: PersistStats,
    /// ID of the recorded run, if recording succeeded
    pub run_id: Option<i64>,
}

impl SearchOutcome {
    fn stopped_before_crawl(stop_reason: StopReason, run_id: Option<i64>) -> Self {
        Self {
            saved: Vec::new(),
            page_number: 0,
            pages_processed: 0,
            total_saved: 0,
            stop_reason,
            stats: PersistStats::default(),
            run_id,
        }
    }
}

/// What the pagination step produced
enum Advance<E> {
    /// A new page with cards
    Next(Vec<E>),
    /// A new page that stayed empty but is still inside the grace threshold
    Continue,
    /// Navigation failed but the current page still has cards
    Recovered(Vec<E>),
    Stop(StopReason),
}

/// One search over a browser session and a job store
pub struct JobSearch<S: BrowserSession, St: JobStore> {
    session: S,
    store: St,
    base_url: Url,
    search: SearchConfig,
    login: LoginConfig,
    extractor: ListingExtractor,
    persister: Persister,
    stop: StopHandle,
    config_hash: String,
}

impl<S: BrowserSession, St: JobStore> JobSearch<S, St> {
    /// Creates a search over an acquired session and an opened store
    ///
    /// # Arguments
    ///
    /// * `session` - Browser session; closed by [`JobSearch::run`]
    /// * `store` - Job store used for novelty checks, inserts and run records
    /// * `config` - Validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(JobSearch)` - Ready to log in and search
    /// * `Err(TrawlError)` - The site base URL does not parse
    pub fn new(session: S, store: St, config: &Config) -> Result<Self, TrawlError> {
        let base_url = Url::parse(&config.site.base_url)?;
        let search = config.search.clone();

        let enricher = DetailEnricher::new(search.detail_settle_delay());
        let persister = Persister::new(enricher, search.request_delay());

        Ok(Self {
            session,
            store,
            extractor: ListingExtractor::new(base_url.clone()),
            base_url,
            search,
            login: config.login.clone(),
            persister,
            stop: StopHandle::new(),
            config_hash: String::new(),
        })
    }

    /// Sets the configuration digest recorded with each run
    pub fn with_config_hash(mut self, hash: &str) -> Self {
        self.config_hash = hash.to_string();
        self
    }

    /// Shares an existing cancellation flag with this search
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle the host can use to stop the search between pages
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn store(&self) -> &St {
        &self.store
    }


    /// Logs in through the session
    pub async fn login(&mut self, credentials: &Credentials) -> bool {
        let authenticator = Authenticator::new(self.base_url.as_str(), self.login.clone());
        authenticator.login(&mut self.session, credentials).await
    }

    /// Logs in when credentials are given, searches, then closes the session
    ///
    /// The session is closed on every path, including a failed login and a
    /// cancelled search.
    pub async fn run(
        &mut self,
        credentials: Option<&Credentials>,
        filters: &SearchFilters,
    ) -> SearchOutcome {
        let outcome = match credentials {
            Some(credentials) if !self.login(credentials).await => {
                tracing::error!("Login failed, not searching");
                SearchOutcome::stopped_before_crawl(StopReason::LoginFailed, None)
            }
            _ => self.search(filters).await,
        };

        if let Err(e) = self.session.close().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }

        outcome
    }

    /// Runs the pagination loop for one set of filters
    ///
    /// Never fails: faults on individual pages end the search early and the
    /// records saved until then are returned.
    pub async fn search(&mut self, filters: &SearchFilters) -> SearchOutcome {
        let run_id = match self.store.create_run(&self.config_hash) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Could not record search run: {}", e);
                None
            }
        };

        let outcome = self.crawl(filters, run_id).await;

        if let Some(run_id) = run_id {
            if let Err(e) = self.store.finish_run(
                run_id,
                outcome.stop_reason.run_status(),
                outcome.stop_reason.as_str(),
                outcome.pages_processed,
                outcome.total_saved,
            ) {
                tracing::warn!("Could not finish search run {}: {}", run_id, e);
            }
        }

        tracing::info!(
            "Search completed: {} pages processed, {} jobs saved (target {}), stopped: {}",
            outcome.pages_processed,
            outcome.total_saved,
            self.search.max_jobs_per_search,
            outcome.stop_reason
        );
        if outcome.total_saved < self.search.max_jobs_per_search {
            tracing::warn!(
                "Only saved {} jobs, target was {}",
                outcome.total_saved,
                self.search.max_jobs_per_search
            );
        }

        outcome
    }

    async fn crawl(&mut self, filters: &SearchFilters, run_id: Option<i64>) -> SearchOutcome {
        let search_url = match build_search_url(self.base_url.as_str(), filters) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Could not build search URL: {}", e);
                return SearchOutcome::stopped_before_crawl(StopReason::NavigationFailed, run_id);
            }
        };

        tracing::info!("Searching jobs: {}", search_url);

        if let Err(e) = self.session.navigate(&search_url).await {
            tracing::error!("Could not load search results: {}", e);
            return SearchOutcome::stopped_before_crawl(StopReason::NavigationFailed, run_id);
        }
        pause(self.search.initial_load_delay()).await;

        let cards = self.current_cards().await.unwrap_or_default();
        if cards.is_empty() {
            self.diagnose_empty_search().await;
            return SearchOutcome::stopped_before_crawl(StopReason::NoResults, run_id);
        }

        let mut state = SearchSession::new(cards);
        let mut saved = Vec::new();
        let mut stats = PersistStats::default();

        let stop_reason = loop {
            if self.stop.is_stopped() {
                tracing::info!("Stop requested, ending search before page {}", state.page_number);
                break StopReason::Cancelled;
            }

            state.pages_processed += 1;
            tracing::info!(
                "Processing page {} (attempt {})",
                state.page_number,
                state.pages_processed
            );

            let results_url = self.session.current_url().await.ok();
            let cards = std::mem::take(&mut state.cards);
            let candidates = self.extractor.extract_all(&cards).await;
            drop(cards);

            let mut results_lost = false;
            if candidates.is_empty() {
                tracing::warn!("No jobs extracted from page {}", state.page_number);
            } else {
                let batch = self
                    .persister
                    .process(&mut self.session, &mut self.store, candidates)
                    .await;
                state.total_saved += batch.stats.saved;
                stats.absorb(batch.stats);
                saved.extend(batch.saved);

                if let Some(url) = &results_url {
                    if let Err(e) = self.return_to_results(url).await {
                        tracing::warn!("Could not return to results page {}: {}", url, e);
                        results_lost = true;
                    }
                }
            }

            tracing::info!(
                "Progress: {}/{} new jobs saved",
                state.total_saved,
                self.search.max_jobs_per_search
            );

            if state.total_saved >= self.search.max_jobs_per_search {
                tracing::info!(
                    "Reached target of {} new jobs saved",
                    self.search.max_jobs_per_search
                );
                break StopReason::QuotaReached;
            }
            if state.pages_processed >= self.search.page_cap {
                tracing::info!("Reached page cap of {}", self.search.page_cap);
                break StopReason::PageCap;
            }

            let advance = if results_lost {
                self.recover().await
            } else {
                self.advance(&mut state).await
            };
            match advance {
                Advance::Next(cards) | Advance::Recovered(cards) => state.cards = cards,
                Advance::Continue => state.cards = Vec::new(),
                Advance::Stop(reason) => break reason,
            }
        };

        SearchOutcome {
            saved,
            page_number: state.page_number,
            pages_processed: state.pages_processed,
            total_saved: state.total_saved,
            stop_reason,
            stats,
            run_id,
        }
    }

    /// Moves to the next result page
    async fn advance(&mut self, state: &mut SearchSession<S::Element>) -> Advance<S::Element> {
        match self.next_page(state).await {
            Ok(advance) => advance,
            Err(e) => {
                tracing::warn!("Error navigating to next page: {}", e);
                self.recover().await
            }
        }
    }

    async fn next_page(
        &mut self,
        state: &mut SearchSession<S::Element>,
    ) -> SessionResult<Advance<S::Element>> {
        if !self.click_next().await? {
            return Ok(Advance::Stop(self.classify_missing_pagination().await));
        }

        pause(self.search.request_delay()).await;
        state.page_number += 1;
        tracing::info!("Now on page {}", state.page_number);
        pause(self.search.page_settle_delay()).await;

        let cards = self.current_cards().await?;
        if !cards.is_empty() {
            return Ok(Advance::Next(cards));
        }

        tracing::info!("No job cards on page {}, retrying once", state.page_number);
        pause(self.search.empty_page_retry_delay()).await;
        let cards = self.current_cards().await?;
        if !cards.is_empty() {
            tracing::info!("Found {} job cards after retry", cards.len());
            return Ok(Advance::Next(cards));
        }

        if state.page_number < self.search.empty_page_grace {
            tracing::warn!(
                "Page {} is still empty, continuing to the next page",
                state.page_number
            );
            Ok(Advance::Continue)
        } else {
            tracing::info!("No more job cards found on page {}", state.page_number);
            Ok(Advance::Stop(StopReason::NoMoreCards))
        }
    }

    /// Clicks the first enabled and visible next control
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A control was clicked
    /// * `Ok(false)` - No usable control on the page
    async fn click_next(&self) -> SessionResult<bool> {
        for selector in NEXT_SELECTORS {
            let buttons = self.session.find_all(selector).await?;
            for button in &buttons {
                if button.is_enabled().await? && button.is_displayed().await? {
                    tracing::debug!("Found working next button: {}", selector);
                    button.click().await?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn classify_missing_pagination(&self) -> StopReason {
        let source = self.session.page_source().await.unwrap_or_default();
        if contains_any(&source, END_MARKERS) {
            tracing::info!("Reached end of results");
            StopReason::EndOfResults
        } else {
            tracing::info!("No pagination found, but the list may not have ended");
            StopReason::NoPagination
        }
    }

    /// Waits once, then looks for cards on whatever page is current
    async fn recover(&self) -> Advance<S::Element> {
        let session = &self.session;
        let policy = PollPolicy::once_after(self.search.recovery_delay());
        let outcome = poll_until(policy, move |_| async move {
            match query(session, CARD_SELECTORS).await {
                Ok(cards) if !cards.is_empty() => Probe::Ready,
                _ => Probe::Pending,
            }
        })
        .await;

        if outcome == PollOutcome::Ready {
            if let Ok(cards) = self.current_cards().await {
                if !cards.is_empty() {
                    tracing::info!("Found {} job cards after error recovery", cards.len());
                    return Advance::Recovered(cards);
                }
            }
        }

        tracing::warn!("No job cards found after error recovery, stopping");
        Advance::Stop(StopReason::NavigationFailed)
    }

    /// Navigates back to the results page after detail fetches moved away from it
    ///
    /// A failure here is a navigation fault; the caller recovers instead of
    /// looking for a next control on the detail page.
    async fn return_to_results(&mut self, results_url: &str) -> SessionResult<()> {
        let current = self.session.current_url().await.ok();
        if current.as_deref() == Some(results_url) {
            return Ok(());
        }

        tracing::debug!("Returning to results page {}", results_url);
        self.session.navigate(results_url).await?;
        pause(self.search.page_settle_delay()).await;
        Ok(())
    }

    async fn current_cards(&self) -> SessionResult<Vec<S::Element>> {
        let cards = query(&self.session, CARD_SELECTORS).await?;
        tracing::debug!("Found {} job cards", cards.len());
        Ok(cards)
    }

    /// Logs why the first result page has no cards
    async fn diagnose_empty_search(&self) {
        let source = self.session.page_source().await.unwrap_or_default();
        if contains_any(&source, LOGIN_REDIRECT_MARKERS) {
            tracing::warn!("No job cards found; the session might have been redirected to login");
        } else if contains_any(&source, EMPTY_SEARCH_MARKERS) {
            tracing::info!("The site reports no jobs found for this search");
        } else {
            tracing::warn!("Page loaded but job cards not found with current selectors");
        }
    }
}

fn contains_any(source: &str, markers: &[&str]) -> bool {
    let lower = source.to_lowercase();
    markers.iter().any(|marker| lower.contains(marker))
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
