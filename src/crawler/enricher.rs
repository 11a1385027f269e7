//! Detail enricher
//!
//! Loads a listing's own page and reads the fields that only appear there.
//! Each field has its own selector chain and defaults to empty on a miss.

use crate::crawler::extractor::{first_success, Strategy};
use crate::session::{query_within, BrowserSession};
use crate::storage::ListingCandidate;
use std::time::Duration;

const DESCRIPTION_STRATEGIES: &[Strategy] = &[
    Strategy::text(".job-details__description-text"),
    Strategy::text(".jobs-description__content"),
];

/// An explicit apply link; its target is the application URL
const APPLY_LINK_STRATEGIES: &[Strategy] = &[Strategy::attribute(
    "a[data-control-name='jobdetails_topcard_inapply']",
    "href",
)];

/// Generic apply buttons; their presence means the listing URL is the application URL
const APPLY_BUTTON_SELECTORS: &[&str] = &[".jobs-apply-button"];

const SALARY_STRATEGIES: &[Strategy] = &[Strategy::text(
    ".job-details-jobs-unified-top-card__job-insight span",
)];

/// Fields read from a listing's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetails {
    pub description: String,
    pub application_url: String,
    pub salary_range: String,
}

impl JobDetails {
    /// Copies the details into a candidate
    pub fn merge_into(self, candidate: &mut ListingCandidate) {
        candidate.description = self.description;
        candidate.application_url = self.application_url;
        candidate.salary_range = self.salary_range;
    }
}

/// Fetches detail pages through the shared session
#[derive(Debug, Clone)]
pub struct DetailEnricher {
    settle: Duration,
}

impl DetailEnricher {
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    /// Navigates to `url` and reads the detail fields
    ///
    /// Never fails: a page that cannot be loaded yields empty details.
    pub async fn enrich<S: BrowserSession>(&self, session: &mut S, url: &str) -> JobDetails {
        if let Err(e) = session.navigate(url).await {
            tracing::warn!("Error getting job details for {}: {}", url, e);
            return JobDetails::default();
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let session: &S = session;
        let Some(body) = page_root(session).await else {
            return JobDetails::default();
        };

        let description = first_success(&body, DESCRIPTION_STRATEGIES, |_| true)
            .await
            .unwrap_or_default();

        let application_url = match first_success(&body, APPLY_LINK_STRATEGIES, |_| true).await {
            Some(target) => target,
            None => {
                if query_within(&body, APPLY_BUTTON_SELECTORS).await.is_empty() {
                    String::new()
                } else {
                    url.to_string()
                }
            }
        };

        let salary_range = first_success(&body, SALARY_STRATEGIES, |_| true)
            .await
            .unwrap_or_default();

        tracing::debug!(
            "Details for {}: description {} chars, apply url '{}', salary '{}'",
            url,
            description.len(),
            application_url,
            salary_range
        );

        JobDetails {
            description,
            application_url,
            salary_range,
        }
    }
}

/// The page's `body` element, so page-level reads can share the card strategies
async fn page_root<S: BrowserSession>(session: &S) -> Option<S::Element> {
    match session.find_all("body").await {
        Ok(mut found) if !found.is_empty() => Some(found.swap_remove(0)),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Could not read detail page: {}", e);
            None
        }
    }
}
