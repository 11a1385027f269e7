//! End-to-end search tests
//!
//! These tests run `JobSearch` over a replayed board and check the stop
//! conditions, novelty rules and recovery behavior of the full pipeline.

use crate::fixtures::{
    board, candidate, config, detail_visits, filters, job_url, page_url, result_page_visits,
    results_page, BASE,
};
use async_trait::async_trait;
use jobtrawl::crawler::{JobSearch, StopHandle, StopReason};
use jobtrawl::session::{BrowserSession, HtmlElement, HtmlSession, SessionError, SessionResult};
use jobtrawl::storage::{JobStore, RunStatus, SqliteStore};
use jobtrawl::Credentials;

fn memory_store() -> SqliteStore {
    SqliteStore::new_in_memory().unwrap()
}

#[tokio::test]
async fn test_quota_stops_at_first_page_reaching_it() {
    let session = board(10, 3);
    let config = config(5, 25, ":memory:");

    let mut search = JobSearch::new(session.clone(), memory_store(), &config).unwrap();
    let outcome = search.search(&filters()).await;

    assert_eq!(outcome.stop_reason, StopReason::QuotaReached);
    assert_eq!(outcome.pages_processed, 2);
    assert_eq!(outcome.total_saved, 6);
    assert_eq!(outcome.saved.len(), 6);
    assert_eq!(search.store().count().unwrap(), 6);

    // no result page beyond the second one was ever requested
    let visits = result_page_visits(&session);
    assert!(visits.contains(&page_url(2)));
    assert!(!visits.contains(&page_url(3)));
}

#[tokio::test]
async fn test_page_cap_with_no_novel_listings() {
    let session = board(30, 2);
    let mut store = memory_store();
    for id in 1..=60 {
        store.insert(&candidate(id)).unwrap();
    }
    let config = config(1000, 25, ":memory:");

    let mut search = JobSearch::new(session.clone(), store, &config).unwrap();
    let outcome = search.search(&filters()).await;

    assert_eq!(outcome.stop_reason, StopReason::PageCap);
    assert_eq!(outcome.pages_processed, 25);
    assert_eq!(outcome.total_saved, 0);
    assert_eq!(outcome.stats.duplicates, 50);
    assert_eq!(detail_visits(&session), 0);
    assert!(!result_page_visits(&session).contains(&page_url(26)));
}

#[tokio::test]
async fn test_saved_records_carry_card_and_detail_fields() {
    let session = board(1, 2);
    let config = config(50, 25, ":memory:");

    let mut search = JobSearch::new(session, memory_store(), &config).unwrap();
    let outcome = search.search(&filters()).await;

    assert_eq!(outcome.stop_reason, StopReason::NoPagination);
    let first = &outcome.saved[0];
    assert_eq!(first.title, "Role 1");
    assert_eq!(first.company, "Company 1");
    assert_eq!(first.location, "City 1, CA");
    assert_eq!(first.url, job_url(1));
    assert_eq!(first.description, "Role 1 builds things.");
    assert_eq!(first.application_url, "https://apply.test/1");
    assert_eq!(first.salary_range, "$110K/yr");
    assert_eq!(first.posted_date.as_deref(), Some("2026-10-02"));
    assert!(!first.applied);
}

#[tokio::test]
async fn test_second_search_saves_nothing_and_fetches_no_details() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("jobs.db");
    let config = config(50, 25, db_path.to_str().unwrap());

    let first_session = board(2, 3);
    let mut first = JobSearch::new(
        first_session.clone(),
        SqliteStore::new(&db_path).unwrap(),
        &config,
    )
    .unwrap();
    let outcome = first.search(&filters()).await;
    assert_eq!(outcome.total_saved, 6);
    drop(first);

    let second_session = board(2, 3);
    let mut second = JobSearch::new(
        second_session.clone(),
        SqliteStore::new(&db_path).unwrap(),
        &config,
    )
    .unwrap();
    let outcome = second.search(&filters()).await;

    assert_eq!(outcome.total_saved, 0);
    assert_eq!(outcome.stats.duplicates, 6);
    assert_eq!(detail_visits(&second_session), 0);
    assert_eq!(second.store().count().unwrap(), 6);
}

#[tokio::test]
async fn test_novelty_by_url_or_triple() {
    let session = board(1, 3);
    let mut store = memory_store();

    // same triple as card 1 under another URL
    let mut moved = candidate(1);
    moved.url = format!("{}/jobs/view/1/?refId=abc", BASE);
    store.insert(&moved).unwrap();

    // same URL as card 2 with another triple
    let mut renamed = candidate(2);
    renamed.title = "Renamed Role".to_string();
    store.insert(&renamed).unwrap();

    let config = config(50, 25, ":memory:");
    let mut search = JobSearch::new(session.clone(), store, &config).unwrap();
    let outcome = search.search(&filters()).await;

    assert_eq!(outcome.total_saved, 1);
    assert_eq!(outcome.stats.duplicates, 2);
    assert_eq!(outcome.saved[0].url, job_url(3));
    assert_eq!(detail_visits(&session), 1);
}

#[tokio::test]
async fn test_search_run_is_recorded() {
    let session = board(10, 3);
    let config = config(5, 25, ":memory:");

    let mut search = JobSearch::new(session, memory_store(), &config)
        .unwrap()
        .with_config_hash("abc123");
    let outcome = search.search(&filters()).await;

    let run = search.store().get_run(outcome.run_id.unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.stop_reason.as_deref(), Some("quota-reached"));
    assert_eq!(run.config_hash, "abc123");
    assert_eq!(run.pages_processed, 2);
    assert_eq!(run.saved, 6);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_navigation_fault_recovers_on_current_page() {
    // the next control points at a page the site never serves
    let session = HtmlSession::new().with_page(
        &page_url(1),
        &results_page(&[1, 2], Some("https://jobs.test/jobs/search/?broken=1")),
    );
    for id in [1, 2] {
        session.add_page(&job_url(id), &crate::fixtures::detail_page(id));
    }
    let config = config(50, 3, ":memory:");

    let mut search = JobSearch::new(session.clone(), memory_store(), &config).unwrap();
    let outcome = search.search(&filters()).await;

    // every failed click is recovered by re-reading the current page
    assert_eq!(outcome.stop_reason, StopReason::PageCap);
    assert_eq!(outcome.pages_processed, 3);
    assert_eq!(outcome.page_number, 1);
    assert_eq!(outcome.total_saved, 2);
    assert_eq!(outcome.stats.duplicates, 4);
}

/// Session that requests a stop once a given page is loaded
struct StopOnPage {
    inner: HtmlSession,
    trigger: String,
    stop: StopHandle,
}

#[async_trait]
impl BrowserSession for StopOnPage {
    type Element = HtmlElement;

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.inner.navigate(url).await
    }

    async fn current_url(&self) -> SessionResult<String> {
        self.inner.current_url().await
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.inner.page_source().await
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<HtmlElement>> {
        if self.inner.current_url().await.ok().as_deref() == Some(self.trigger.as_str()) {
            self.stop.stop();
        }
        self.inner.find_all(selector).await
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.inner.close().await
    }
}

#[tokio::test]
async fn test_cancellation_between_pages_keeps_saved_records() {
    let inner = board(5, 3);
    let stop = StopHandle::new();
    let session = StopOnPage {
        inner: inner.clone(),
        trigger: page_url(2),
        stop: stop.clone(),
    };
    let config = config(50, 25, ":memory:");

    let mut search = JobSearch::new(session, memory_store(), &config)
        .unwrap()
        .with_stop_handle(stop);
    let outcome = search.run(None, &filters()).await;

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.total_saved, 3);
    assert_eq!(search.store().count().unwrap(), 3);
    assert!(inner.is_closed());

    let run = search.store().get_run(outcome.run_id.unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
}

/// Serves the first results page once; reloading it afterwards fails
struct ResultsGone {
    inner: HtmlSession,
    results: String,
}

#[async_trait]
impl BrowserSession for ResultsGone {
    type Element = HtmlElement;

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        if url == self.results && self.inner.visits().iter().any(|seen| seen == url) {
            return Err(SessionError::UnknownPage(url.to_string()));
        }
        self.inner.navigate(url).await
    }

    async fn current_url(&self) -> SessionResult<String> {
        self.inner.current_url().await
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.inner.page_source().await
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<HtmlElement>> {
        self.inner.find_all(selector).await
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.inner.close().await
    }
}

#[tokio::test]
async fn test_failed_return_to_results_goes_through_recovery() {
    let inner = board(3, 3);
    let session = ResultsGone {
        inner: inner.clone(),
        results: page_url(1),
    };
    let config = config(50, 25, ":memory:");

    let mut search = JobSearch::new(session, memory_store(), &config).unwrap();
    let outcome = search.run(None, &filters()).await;

    // the detail page has no cards, so the single retry cannot recover
    assert_eq!(outcome.stop_reason, StopReason::NavigationFailed);
    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.total_saved, 3);
    assert_eq!(result_page_visits(&inner), vec![page_url(1)]);

    let run = search.store().get_run(outcome.run_id.unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

fn login_pages(session: &HtmlSession, landing: &str, landing_html: &str) {
    session.add_page(
        &format!("{}/login", BASE),
        &format!(
            r#"<html><body><form>
                <input id="username" name="session_key" />
                <input id="password" name="session_password" type="password" />
                <button type="submit" data-href="{}">Sign in</button>
            </form></body></html>"#,
            landing
        ),
    );
    session.add_page(landing, landing_html);
}

fn credentials() -> Credentials {
    Credentials {
        email: "seeker@example.com".to_string(),
        password: "correct horse".to_string(),
    }
}

#[tokio::test]
async fn test_run_logs_in_then_searches() {
    let session = board(1, 2);
    login_pages(
        &session,
        &format!("{}/feed/", BASE),
        r#"<html><body><header class="global-nav">Home</header></body></html>"#,
    );
    let config = config(50, 25, ":memory:");

    let mut search = JobSearch::new(session.clone(), memory_store(), &config).unwrap();
    let outcome = search.run(Some(&credentials()), &filters()).await;

    assert_eq!(outcome.total_saved, 2);
    assert_eq!(session.typed_into("username").as_deref(), Some("seeker@example.com"));
    assert_eq!(session.typed_into("password").as_deref(), Some("correct horse"));
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_rejected_login_skips_search() {
    let session = board(1, 2);
    login_pages(
        &session,
        &format!("{}/login-submit", BASE),
        r#"<html><body><p class="form__label--error">Wrong email or password.</p></body></html>"#,
    );
    let config = config(50, 25, ":memory:");

    let mut search = JobSearch::new(session.clone(), memory_store(), &config).unwrap();
    let outcome = search.run(Some(&credentials()), &filters()).await;

    assert_eq!(outcome.stop_reason, StopReason::LoginFailed);
    assert!(result_page_visits(&session).is_empty());
    assert_eq!(search.store().count().unwrap(), 0);
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_verification_challenge_times_out() {
    let session = board(1, 2);
    login_pages(
        &session,
        &format!("{}/checkpoint/challenge/", BASE),
        "<html><body><p>Let's do a quick security check</p></body></html>",
    );
    let config = config(50, 25, ":memory:");

    let mut search = JobSearch::new(session.clone(), memory_store(), &config).unwrap();
    assert!(!search.login(&credentials()).await);
}
