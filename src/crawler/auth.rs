//! Authentication gate
//!
//! Submits credentials once, then waits for one of three mutually exclusive
//! signals: the authenticated landing page, an explicit login error, or a
//! verification challenge that a human has to complete in the browser.

use crate::config::{Credentials, LoginConfig};
use crate::crawler::poll::{poll_until, PollOutcome, PollPolicy, Probe};
use crate::session::{query, BrowserSession, PageElement};
use std::time::Duration;

const USERNAME_FIELD: &str = "#username";
const PASSWORD_FIELD: &str = "#password";
const SUBMIT_SELECTORS: &[&str] = &["button[type='submit']", "input[type='submit']"];

/// Present only once the authenticated landing page has rendered
const AUTHENTICATED_MARKERS: &[&str] = &[".global-nav", "#global-nav"];

const ERROR_MARKERS: &[&str] = &[".form__label--error", "#error-for-password"];

/// URL fragments of verification pages
const CHALLENGE_PATTERNS: &[&str] = &["challenge", "checkpoint"];

const FORM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of one login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    /// The site showed an explicit error marker
    Rejected(String),
    /// Neither success nor error appeared within the budget
    TimedOut,
    /// The login page could not be loaded or filled in
    Unavailable(String),
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Drives the login form of the target site
pub struct Authenticator {
    login_url: String,
    config: LoginConfig,
}

impl Authenticator {
    pub fn new(base_url: &str, config: LoginConfig) -> Self {
        Self {
            login_url: format!("{}/login", base_url.trim_end_matches('/')),
            config,
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Logs in and reports success as a boolean
    pub async fn login<S: BrowserSession>(
        &self,
        session: &mut S,
        credentials: &Credentials,
    ) -> bool {
        self.attempt(session, credentials).await.is_authenticated()
    }

    /// Logs in once and reports how the attempt ended
    ///
    /// The submission itself is never retried; the caller decides whether to
    /// start a new attempt.
    pub async fn attempt<S: BrowserSession>(
        &self,
        session: &mut S,
        credentials: &Credentials,
    ) -> LoginOutcome {
        if let Err(e) = session.navigate(&self.login_url).await {
            tracing::error!("Login failed - could not load {}: {}", self.login_url, e);
            return LoginOutcome::Unavailable(e.to_string());
        }

        let session: &S = session;

        let form_policy = PollPolicy::new(self.config.form_timeout(), FORM_POLL_INTERVAL);
        let form = poll_until(form_policy, move |_| async move {
            match session.find_all(USERNAME_FIELD).await {
                Ok(found) if !found.is_empty() => Probe::Ready,
                _ => Probe::Pending,
            }
        })
        .await;

        if form != PollOutcome::Ready {
            tracing::error!("Login failed - initial page load timeout");
            return LoginOutcome::Unavailable("login form did not appear".to_string());
        }

        if let Err(e) = submit_form(session, credentials).await {
            tracing::error!("Login failed: {}", e);
            return LoginOutcome::Unavailable(e);
        }

        tracing::info!("Login submitted, waiting for verification or redirect...");

        let timeout = self.config.timeout();
        let policy = PollPolicy::new(timeout, self.config.poll_interval());
        tracing::debug!(
            "Checking login state every {:?}, at most {} times",
            self.config.poll_interval(),
            policy.max_probes()
        );
        let outcome = poll_until(policy, move |elapsed| {
            probe_login(session, elapsed, timeout)
        })
        .await;

        match outcome {
            PollOutcome::Ready => {
                tracing::info!("Successfully logged in");
                LoginOutcome::Authenticated
            }
            PollOutcome::Fault => {
                let message = error_message(session).await;
                tracing::error!("Login error: {}", message);
                LoginOutcome::Rejected(message)
            }
            PollOutcome::TimedOut => {
                if has_any(session, AUTHENTICATED_MARKERS).await {
                    tracing::info!("Login completed successfully after verification");
                    LoginOutcome::Authenticated
                } else {
                    tracing::error!("Login failed - timeout waiting for verification completion");
                    LoginOutcome::TimedOut
                }
            }
        }
    }
}

async fn submit_form<S: BrowserSession>(
    session: &S,
    credentials: &Credentials,
) -> Result<(), String> {
    let username = first_element(session, &[USERNAME_FIELD], "username field").await?;
    let password = first_element(session, &[PASSWORD_FIELD], "password field").await?;
    let submit = first_element(session, SUBMIT_SELECTORS, "submit button").await?;

    username
        .send_keys(&credentials.email)
        .await
        .map_err(|e| e.to_string())?;
    password
        .send_keys(&credentials.password)
        .await
        .map_err(|e| e.to_string())?;
    submit.click().await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn first_element<S: BrowserSession>(
    session: &S,
    selectors: &[&str],
    what: &str,
) -> Result<S::Element, String> {
    query(session, selectors)
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .next()
        .ok_or_else(|| format!("{} not found", what))
}

/// One tick of the login wait
///
/// Success is checked before the challenge and error markers, so a page that
/// already shows the landing navigation is never reported as failed. Error
/// markup on a verification page does not end the wait.
async fn probe_login<S: BrowserSession>(session: &S, elapsed: Duration, timeout: Duration) -> Probe {
    if has_any(session, AUTHENTICATED_MARKERS).await {
        return Probe::Ready;
    }

    match session.current_url().await {
        Ok(url) if is_challenge(&url) => {
            tracing::warn!(
                "Verification required. Please complete verification in browser. Waiting... ({}s/{}s)",
                elapsed.as_secs(),
                timeout.as_secs()
            );
            return Probe::Pending;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(
                "Waiting for login completion... ({}s/{}s): {}",
                elapsed.as_secs(),
                timeout.as_secs(),
                e
            );
            return Probe::Pending;
        }
    }

    if has_any(session, ERROR_MARKERS).await {
        return Probe::Fault;
    }

    Probe::Pending
}

async fn has_any<S: BrowserSession>(session: &S, selectors: &[&str]) -> bool {
    query(session, selectors)
        .await
        .map(|found| !found.is_empty())
        .unwrap_or(false)
}

async fn error_message<S: BrowserSession>(session: &S) -> String {
    if let Ok(found) = query(session, ERROR_MARKERS).await {
        if let Some(first) = found.first() {
            if let Ok(text) = first.text().await {
                if !text.trim().is_empty() {
                    return text.trim().to_string();
                }
            }
        }
    }
    "login rejected".to_string()
}

/// Returns true if the URL points at a verification page
pub fn is_challenge(url: &str) -> bool {
    CHALLENGE_PATTERNS.iter().any(|pattern| url.contains(pattern))
}
