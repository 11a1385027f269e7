//! Listing extractor
//!
//! Turns one result card into a [`ListingCandidate`]. Every field is read by an
//! ordered list of [`Strategy`] values combined by first success, so markup
//! churn on the target only ever touches the tables at the top of this file.
//!
//! Company and location have no stable containers. They are first recovered by
//! classifying the card's raw text tokens (see [`classify_tokens`]) and only
//! then by selector fallback.

use crate::session::PageElement;
use crate::storage::ListingCandidate;
use url::Url;

/// Result card containers, most specific first
pub const CARD_SELECTORS: &[&str] = &[
    ".job-search-card",
    ".jobs-search-results__list-item",
    ".job-result-card",
    "[data-job-id]",
    ".jobs-search-results-list .jobs-search-results__list-item",
];

/// Title links; the link text is the title and its `href` the listing URL
const TITLE_SELECTORS: &[&str] = &[
    ".job-card-container__link",
    "a[aria-label]",
    ".job-card-list__title a",
    ".job-search-card__title a",
    ".job-result-card__title a",
    "h3 a[data-control-name*='job']",
];

const COMPANY_STRATEGIES: &[Strategy] = &[
    Strategy::text(".artdeco-entity-lockup__subtitle"),
    Strategy::text(".job-card-container__company-name"),
    Strategy::text(".job-card-list__company-name"),
    Strategy::text("h4 a"),
];

const LOCATION_STRATEGIES: &[Strategy] = &[
    Strategy::text(".job-card-container__metadata-item"),
    Strategy::text(".job-card-list__location"),
];

const POSTED_DATE_STRATEGIES: &[Strategy] = &[
    Strategy::attribute(".job-search-card__listitem--footerItem time", "datetime"),
    Strategy::attribute(".job-result-card__listitem--footerItem time", "datetime"),
    Strategy::attribute("time[datetime]", "datetime"),
];

/// Elements whose text feeds the token classifier
const TOKEN_SELECTOR: &str = "span";

/// Badge texts that are never a company or a location
const BADGE_TOKENS: &[&str] = &["Promoted", "Easy Apply", "Actively hiring"];

const VERIFICATION_SUFFIX: &str = " with verification";

/// Substrings that mark a token as a location
const LOCATION_INDICATORS: &[&str] = &[
    "CA",
    "NY",
    "TX",
    "FL",
    "IL",
    "Remote",
    "Hybrid",
    "On-site",
    "Metropolitan Area",
    "United States",
    "(",
    ")",
];

/// How a strategy reads its value from the matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    Text,
    Attribute(&'static str),
}

/// One way of reading a field: the first element matching `selector`, read as `read`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub selector: &'static str,
    pub read: Read,
}

impl Strategy {
    pub const fn text(selector: &'static str) -> Self {
        Self {
            selector,
            read: Read::Text,
        }
    }

    pub const fn attribute(selector: &'static str, name: &'static str) -> Self {
        Self {
            selector,
            read: Read::Attribute(name),
        }
    }

    /// Applies the strategy to a card. Empty values count as a miss.
    pub async fn apply<E: PageElement>(&self, card: &E) -> Option<String> {
        let found = card.find_all(self.selector).await.ok()?;
        let element = found.first()?;
        let value = match self.read {
            Read::Text => element.text().await.ok()?,
            Read::Attribute(name) => element.attribute(name).await.ok()??,
        };
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// First non-empty value produced by the strategies that `accept` allows
pub async fn first_success<E, F>(card: &E, strategies: &[Strategy], accept: F) -> Option<String>
where
    E: PageElement,
    F: Fn(&str) -> bool,
{
    for strategy in strategies {
        if let Some(value) = strategy.apply(card).await {
            if accept(&value) {
                tracing::debug!("Matched {} with value '{}'", strategy.selector, value);
                return Some(value);
            }
        }
    }
    None
}

/// A card title in its two forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    /// First line, whitespace collapsed
    pub raw: String,
    /// `raw` with the verification badge text removed
    pub clean: String,
}

impl Title {
    pub fn parse(text: &str) -> Option<Self> {
        let first_line = text.lines().map(str::trim).find(|line| !line.is_empty())?;
        let raw = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
        let clean = raw.replace(VERIFICATION_SUFFIX, "").trim().to_string();
        if clean.is_empty() {
            return None;
        }
        Some(Self { raw, clean })
    }

    /// Texts the token classifier must never pick as company or location
    pub fn skip_set(&self) -> Vec<String> {
        let mut skip = vec![self.raw.clone(), self.clean.clone()];
        skip.extend(BADGE_TOKENS.iter().map(|badge| badge.to_string()));

        // Titles are sometimes rendered twice in one text node ("Dev Ops Dev Ops");
        // the part before the first word repeats is the base title.
        if let Some(first_word) = self.raw.split_whitespace().next() {
            let repeat = format!(" {}", first_word);
            let base = self.raw.split(repeat.as_str()).next().unwrap_or("").trim();
            if !base.is_empty() {
                skip.push(base.to_string());
                skip.push(format!("{}{}", base, VERIFICATION_SUFFIX));
            }
        }
        skip
    }
}

/// Company and location recovered from a card's raw tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classified {
    pub company: Option<String>,
    pub location: Option<String>,
}

/// Returns true if the token contains one of the location indicators
pub fn is_location_token(token: &str) -> bool {
    LOCATION_INDICATORS
        .iter()
        .any(|indicator| token.contains(indicator))
}

/// Classifies a card's text tokens into company and location
///
/// Tokens in the skip set or shorter than three characters are ignored. The
/// first location-like token is the location; the first other token is the
/// company, and once a company is known the next unused token is taken as the
/// location if none was seen yet.
pub fn classify_tokens(title: &Title, tokens: &[String]) -> Classified {
    let skip = title.skip_set();
    let mut result = Classified::default();

    for token in tokens {
        let token = token.trim();
        if token.chars().count() <= 2 || skip.iter().any(|s| s == token) {
            continue;
        }

        if is_location_token(token) {
            if result.location.is_none() {
                tracing::debug!("Token '{}' classified as location", token);
                result.location = Some(token.to_string());
            }
        } else if result.company.is_none() {
            tracing::debug!("Token '{}' classified as company", token);
            result.company = Some(token.to_string());
        } else if result.location.is_none() {
            tracing::debug!("Token '{}' taken as location after company", token);
            result.location = Some(token.to_string());
        }

        if result.company.is_some() && result.location.is_some() {
            break;
        }
    }

    result
}

/// Extracts listing candidates from result cards
#[derive(Debug, Clone)]
pub struct ListingExtractor {
    base: Url,
}

impl ListingExtractor {
    /// Relative listing links are resolved against `base`
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// Extracts a single card
    ///
    /// # Returns
    ///
    /// * `Some(ListingCandidate)` - Title and URL were found; other fields may be empty
    /// * `None` - No title strategy produced both a title and a link
    pub async fn extract<E: PageElement>(&self, card: &E) -> Option<ListingCandidate> {
        let (title, url) = self.title_and_url(card).await?;

        let tokens = self.tokens(card).await;
        let classified = classify_tokens(&title, &tokens);

        let company = match classified.company {
            Some(company) => company,
            None => first_success(card, COMPANY_STRATEGIES, |value| value != title.clean)
                .await
                .unwrap_or_default(),
        };

        let location = match classified.location {
            Some(location) => location,
            None => first_success(card, LOCATION_STRATEGIES, |_| true)
                .await
                .unwrap_or_default(),
        };

        let posted_date = first_success(card, POSTED_DATE_STRATEGIES, |_| true).await;

        let mut candidate = ListingCandidate::new(&title.clean, &company, &location, &url);
        candidate.posted_date = posted_date;
        Some(candidate)
    }

    /// Extracts every card in document order, dropping the ones that fail
    pub async fn extract_all<E: PageElement>(&self, cards: &[E]) -> Vec<ListingCandidate> {
        let mut candidates = Vec::with_capacity(cards.len());

        for (i, card) in cards.iter().enumerate() {
            match self.extract(card).await {
                Some(candidate) => {
                    tracing::debug!(
                        "Extracted job {}: {} at {}",
                        i + 1,
                        candidate.title,
                        candidate.company
                    );
                    candidates.push(candidate);
                }
                None => tracing::debug!("Failed to extract job {}", i + 1),
            }
        }

        tracing::info!(
            "Successfully extracted {} out of {} job cards",
            candidates.len(),
            cards.len()
        );
        candidates
    }

    async fn title_and_url<E: PageElement>(&self, card: &E) -> Option<(Title, String)> {
        for selector in TITLE_SELECTORS {
            let Ok(found) = card.find_all(selector).await else {
                continue;
            };
            let Some(link) = found.first() else {
                continue;
            };

            let title = match link.text().await {
                Ok(text) => Title::parse(&text),
                Err(_) => None,
            };
            let href = link.attribute("href").await.ok().flatten();

            if let (Some(title), Some(href)) = (title, href) {
                if let Some(url) = self.resolve(&href) {
                    return Some((title, url));
                }
            }
        }

        tracing::debug!("Could not find job title in card");
        None
    }

    async fn tokens<E: PageElement>(&self, card: &E) -> Vec<String> {
        let Ok(spans) = card.find_all(TOKEN_SELECTOR).await else {
            return Vec::new();
        };

        let mut tokens = Vec::with_capacity(spans.len());
        for span in &spans {
            if let Ok(text) = span.text().await {
                let text = text.trim();
                if !text.is_empty() {
                    tokens.push(text.to_string());
                }
            }
        }
        tokens
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        self.base.join(href).ok().map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{query, BrowserSession, HtmlSession};

    const PAGE_URL: &str = "https://jobs.test/jobs/search/";

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn title(text: &str) -> Title {
        Title::parse(text).unwrap()
    }

    async fn extract_cards(html: &str) -> Vec<Option<ListingCandidate>> {
        let mut session = HtmlSession::new().with_page(PAGE_URL, html);
        session.navigate(PAGE_URL).await.unwrap();
        let cards = query(&session, CARD_SELECTORS).await.unwrap();
        let extractor = ListingExtractor::new(Url::parse(PAGE_URL).unwrap());

        let mut out = Vec::new();
        for card in &cards {
            out.push(extractor.extract(card).await);
        }
        out
    }

    #[test]
    fn test_classify_reference_tokens() {
        let t = title("Senior Engineer");
        let result = classify_tokens(
            &t,
            &tokens(&["Senior Engineer", "Acme Corp", "San Francisco, CA", "Easy Apply"]),
        );
        assert_eq!(result.company.as_deref(), Some("Acme Corp"));
        assert_eq!(result.location.as_deref(), Some("San Francisco, CA"));
    }

    #[test]
    fn test_classify_never_selects_badges() {
        let t = title("Data Scientist");
        let result = classify_tokens(
            &t,
            &tokens(&["Promoted", "Easy Apply", "Actively hiring", "Data Scientist"]),
        );
        assert_eq!(result, Classified::default());
    }

    #[test]
    fn test_classify_location_before_company() {
        let t = title("Backend Developer");
        let result = classify_tokens(&t, &tokens(&["Remote", "Initech", "Austin, TX"]));
        assert_eq!(result.company.as_deref(), Some("Initech"));
        assert_eq!(result.location.as_deref(), Some("Remote"));
    }

    #[test]
    fn test_classify_second_plain_token_is_location() {
        let t = title("Platform Engineer");
        let result = classify_tokens(&t, &tokens(&["Globex", "Berlin"]));
        assert_eq!(result.company.as_deref(), Some("Globex"));
        assert_eq!(result.location.as_deref(), Some("Berlin"));
    }

    #[test]
    fn test_classify_skips_short_tokens() {
        let t = title("Analyst");
        let result = classify_tokens(&t, &tokens(&["·", "3d", "Umbrella"]));
        assert_eq!(result.company.as_deref(), Some("Umbrella"));
        assert_eq!(result.location, None);
    }

    #[test]
    fn test_title_parse_normalizes() {
        let t = title("  Staff   Engineer with verification\nStaff Engineer ");
        assert_eq!(t.raw, "Staff Engineer with verification");
        assert_eq!(t.clean, "Staff Engineer");
        assert!(Title::parse("   \n  ").is_none());
    }

    #[test]
    fn test_skip_set_includes_repeated_title_base() {
        let t = title("Rust Developer Rust Developer with verification");
        let skip = t.skip_set();
        assert!(skip.contains(&"Rust Developer".to_string()));
        assert!(skip.contains(&"Rust Developer with verification".to_string()));
        assert!(skip.contains(&"Promoted".to_string()));
    }

    #[test]
    fn test_location_indicators() {
        assert!(is_location_token("New York, NY"));
        assert!(is_location_token("London (Hybrid)"));
        assert!(is_location_token("Remote"));
        assert!(!is_location_token("Acme Corp"));
    }

    #[tokio::test]
    async fn test_extract_primary_selectors() {
        let html = r#"<html><body><ul>
            <li class="job-search-card">
                <a class="job-card-container__link" href="/jobs/view/1">Senior Engineer</a>
                <span>Senior Engineer</span>
                <span>Acme Corp</span>
                <span>San Francisco, CA</span>
                <span>Easy Apply</span>
                <time datetime="2026-10-01">2 weeks ago</time>
            </li>
        </ul></body></html>"#;

        let results = extract_cards(html).await;
        let candidate = results[0].clone().unwrap();
        assert_eq!(candidate.title, "Senior Engineer");
        assert_eq!(candidate.company, "Acme Corp");
        assert_eq!(candidate.location, "San Francisco, CA");
        assert_eq!(candidate.url, "https://jobs.test/jobs/view/1");
        assert_eq!(candidate.posted_date.as_deref(), Some("2026-10-01"));
        assert!(candidate.description.is_empty());
    }

    #[tokio::test]
    async fn test_extract_falls_back_to_secondary_title_selector() {
        let html = r#"<html><body>
            <div class="job-result-card">
                <h3 class="job-result-card__title"><a href="https://jobs.test/jobs/view/2">QA Lead</a></h3>
            </div>
            <div class="job-result-card"><p>No link here</p></div>
        </body></html>"#;

        let results = extract_cards(html).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().title, "QA Lead");
        assert!(results[1].is_none());
    }

    #[tokio::test]
    async fn test_extract_selector_fallback_for_company_and_location() {
        let html = r#"<html><body>
            <div data-job-id="9">
                <a class="job-card-container__link" href="/jobs/view/9">Designer</a>
                <div class="artdeco-entity-lockup__subtitle">Designer</div>
                <h4><a href="/company/hooli">Hooli</a></h4>
                <div class="job-card-container__metadata-item">Palo Alto</div>
            </div>
        </body></html>"#;

        let results = extract_cards(html).await;
        let candidate = results[0].clone().unwrap();
        // the subtitle repeats the title, so the next container wins
        assert_eq!(candidate.company, "Hooli");
        assert_eq!(candidate.location, "Palo Alto");
        assert_eq!(candidate.posted_date, None);
    }

    #[tokio::test]
    async fn test_strategy_reads_attribute() {
        let mut session = HtmlSession::new().with_page(
            PAGE_URL,
            r#"<html><body><div id="card"><time datetime="2026-01-02">x</time></div></body></html>"#,
        );
        session.navigate(PAGE_URL).await.unwrap();
        let card = session.find_all("#card").await.unwrap().remove(0);

        let strategy = Strategy::attribute("time", "datetime");
        assert_eq!(strategy.apply(&card).await.as_deref(), Some("2026-01-02"));
        assert_eq!(Strategy::attribute("time", "missing").apply(&card).await, None);
        assert_eq!(Strategy::text("p").apply(&card).await, None);
    }
}
