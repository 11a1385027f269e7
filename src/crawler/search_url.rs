//! Search filters to navigation target
//!
//! Filter values are matched case-insensitively; values with no known
//! parameter are dropped rather than rejected.

use crate::config::SearchFilters;
use url::Url;

const SEARCH_PATH: &str = "/jobs/search/";

/// Builds the results URL for a set of search filters
///
/// # Arguments
///
/// * `base_url` - Site root, e.g. `https://www.linkedin.com`
/// * `filters` - Requested filters; unset fields add no parameter
///
/// # Returns
///
/// * `Ok(String)` - Absolute search URL
/// * `Err(url::ParseError)` - The base URL is not a valid absolute URL
pub fn build_search_url(base_url: &str, filters: &SearchFilters) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?.join(SEARCH_PATH)?;

    {
        let mut query = url.query_pairs_mut();

        if let Some(title) = non_empty(&filters.job_title) {
            query.append_pair("keywords", title);
        }
        if let Some(location) = non_empty(&filters.location) {
            query.append_pair("location", location);
        }
        if let Some(code) = non_empty(&filters.experience_level).and_then(experience_code) {
            query.append_pair("f_E", code);
        }
        if let Some(code) = non_empty(&filters.time_posted).and_then(time_posted_code) {
            query.append_pair("f_TPR", code);
        }
        if let Some(code) = non_empty(&filters.remote_option).and_then(workplace_code) {
            query.append_pair("f_WT", code);
        }
        if let Some(bucket) = non_empty(&filters.salary_range).and_then(salary_bucket) {
            query.append_pair("f_SB2", &bucket.to_string());
        }
    }

    if let Some(size) = non_empty(&filters.company_size) {
        tracing::debug!("Company size filter '{}' has no search parameter, ignoring", size);
    }

    Ok(url.into())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn experience_code(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "internship" => Some("1"),
        "entry" => Some("2"),
        "associate" => Some("3"),
        "mid" => Some("4"),
        "director" => Some("5"),
        "executive" => Some("6"),
        other => {
            tracing::debug!("Unknown experience level '{}', ignoring", other);
            None
        }
    }
}

fn time_posted_code(window: &str) -> Option<&'static str> {
    match window.to_lowercase().as_str() {
        "24h" => Some("r86400"),
        "week" => Some("r604800"),
        "month" => Some("r2592000"),
        other => {
            tracing::debug!("Unknown posting window '{}', ignoring", other);
            None
        }
    }
}

fn workplace_code(option: &str) -> Option<&'static str> {
    match option.to_lowercase().as_str() {
        "on-site" | "onsite" => Some("1"),
        "remote" => Some("2"),
        "hybrid" => Some("3"),
        other => {
            tracing::debug!("Unknown remote option '{}', ignoring", other);
            None
        }
    }
}

/// Maps a salary floor to the site's bucket: 40k is 1, each further 20k adds one, up to 200k
///
/// Accepts `100k`, `$100,000`, `100000+` or `100k-150k` (the lower bound counts).
fn salary_bucket(range: &str) -> Option<u32> {
    let start = range.find(|c: char| c.is_ascii_digit())?;
    let rest = &range[start..];
    let digits: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    let amount: u64 = digits.parse().ok()?;

    let after = rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == ',');
    let thousands = if after.starts_with(['k', 'K']) {
        amount
    } else if amount >= 1000 {
        amount / 1000
    } else {
        amount
    };

    if thousands < 40 {
        return None;
    }
    let bucket = ((thousands - 40) / 20 + 1).min(9);
    Some(bucket as u32)
}
