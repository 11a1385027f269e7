//! Replayed job board used by the integration tests

use jobtrawl::config::{
    BrowserConfig, Config, LoginConfig, OutputConfig, SearchConfig, SearchFilters, SiteConfig,
};
use jobtrawl::storage::ListingCandidate;
use jobtrawl::HtmlSession;

pub const BASE: &str = "https://jobs.test";

/// Filters every test searches with
pub fn filters() -> SearchFilters {
    SearchFilters {
        job_title: Some("rust".to_string()),
        ..SearchFilters::default()
    }
}

/// URL of result page `n` (1-based)
pub fn page_url(n: u32) -> String {
    if n == 1 {
        format!("{}/jobs/search/?keywords=rust", BASE)
    } else {
        format!("{}/jobs/search/?keywords=rust&start={}", BASE, (n - 1) * 25)
    }
}

pub fn job_url(id: u32) -> String {
    format!("{}/jobs/view/{}/", BASE, id)
}

/// The candidate that card `id` extracts to
pub fn candidate(id: u32) -> ListingCandidate {
    ListingCandidate::new(
        &format!("Role {}", id),
        &format!("Company {}", id),
        &format!("City {}, CA", id),
        &job_url(id),
    )
}

pub fn card(id: u32) -> String {
    format!(
        r#"<li class="jobs-search-results__list-item" data-job-id="{id}">
            <a class="job-card-container__link" href="/jobs/view/{id}/">Role {id}</a>
            <span>Role {id}</span>
            <span>Company {id}</span>
            <span>City {id}, CA</span>
            <span>Easy Apply</span>
            <time datetime="2026-10-0{day}">recently</time>
        </li>"#,
        id = id,
        day = id % 9 + 1
    )
}

pub fn results_page(ids: &[u32], next: Option<&str>) -> String {
    let cards: String = ids.iter().map(|id| card(*id)).collect();
    let next = next
        .map(|href| {
            format!(
                r#"<div class="jobs-search-results-list__pagination">
                    <button aria-label="View next page" data-href="{}">Next</button>
                </div>"#,
                href
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><body><div class="jobs-search-results-list"><ul>{}</ul></div>{}</body></html>"#,
        cards, next
    )
}

pub fn detail_page(id: u32) -> String {
    format!(
        r#"<html><body>
            <div class="job-details__description-text">Role {id} builds things.</div>
            <a data-control-name="jobdetails_topcard_inapply" href="https://apply.test/{id}">Apply</a>
            <div class="job-details-jobs-unified-top-card__job-insight"><span>$1{id}0K/yr</span></div>
        </body></html>"#,
        id = id
    )
}

/// A board of `pages` result pages with `per_page` cards each
///
/// Card IDs run from 1 upward across pages. Every page but the last links to
/// the next one, and every card has a detail page.
pub fn board(pages: u32, per_page: u32) -> HtmlSession {
    let session = HtmlSession::new();
    for page in 1..=pages {
        let ids: Vec<u32> = ((page - 1) * per_page + 1..=page * per_page).collect();
        let next = (page < pages).then(|| page_url(page + 1));
        session.add_page(&page_url(page), &results_page(&ids, next.as_deref()));
        for id in ids {
            session.add_page(&job_url(id), &detail_page(id));
        }
    }
    session
}

/// Loads of result pages (as opposed to detail pages), in order
pub fn result_page_visits(session: &HtmlSession) -> Vec<String> {
    session
        .visits()
        .into_iter()
        .filter(|url| url.contains("/jobs/search/"))
        .collect()
}

pub fn detail_visits(session: &HtmlSession) -> usize {
    session
        .visits()
        .iter()
        .filter(|url| url.contains("/jobs/view/"))
        .count()
}

pub fn config(quota: u32, page_cap: u32, database_path: &str) -> Config {
    Config {
        browser: BrowserConfig::default(),
        site: SiteConfig {
            base_url: BASE.to_string(),
        },
        search: SearchConfig {
            max_jobs_per_search: quota,
            page_cap,
            ..SearchConfig::default()
        }
        .without_delays(),
        login: LoginConfig {
            timeout: 50,
            poll_interval: 5,
            form_timeout: 20,
        },
        output: OutputConfig {
            database_path: database_path.to_string(),
        },
        filters: filters(),
    }
}
