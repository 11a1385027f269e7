//! Browser session collaborator
//!
//! The crawler never talks to a browser directly. It drives a [`BrowserSession`]
//! and the [`PageElement`]s it hands out. Two implementations live here:
//!
//! - [`WebDriverSession`]: a live browser behind a WebDriver endpoint
//! - [`HtmlSession`]: captured pages replayed from memory, keyed by URL

mod html;
mod webdriver;

pub use html::{HtmlElement, HtmlSession};
pub use webdriver::{DriverElement, WebDriverSession};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a browser session or one of its elements
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("WebDriver error: {0}")]
    Driver(#[from] thirtyfour::error::WebDriverError),

    #[error("No page available for {0}")]
    UnknownPage(String),

    #[error("Element is no longer attached to the page")]
    StaleElement,

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("Session already closed")]
    Closed,
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// A handle to one element of the current page
#[async_trait]
pub trait PageElement: Sized + Send + Sync {
    /// Rendered text of the element and its descendants
    async fn text(&self) -> SessionResult<String>;

    /// Value of an attribute, `None` when absent
    async fn attribute(&self, name: &str) -> SessionResult<Option<String>>;

    async fn click(&self) -> SessionResult<()>;

    async fn is_enabled(&self) -> SessionResult<bool>;

    async fn is_displayed(&self) -> SessionResult<bool>;

    /// Types text into the element
    async fn send_keys(&self, text: &str) -> SessionResult<()>;

    /// Descendants matching a CSS selector, in document order
    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Self>>;
}

/// A single browser session shared by login, pagination and detail fetches
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Element: PageElement;

    async fn navigate(&mut self, url: &str) -> SessionResult<()>;

    async fn current_url(&self) -> SessionResult<String>;

    async fn page_source(&self) -> SessionResult<String>;

    /// Elements of the current page matching a CSS selector, in document order
    async fn find_all(&self, selector: &str) -> SessionResult<Vec<Self::Element>>;

    /// Releases the session. Further calls fail with [`SessionError::Closed`].
    async fn close(&mut self) -> SessionResult<()>;
}

/// Queries a prioritized selector list against the current page
///
/// Selectors are tried in order; the first one that matches at least one
/// element wins. A selector that faults is logged and skipped.
pub async fn query<S: BrowserSession>(
    session: &S,
    selectors: &[&str],
) -> SessionResult<Vec<S::Element>> {
    for selector in selectors {
        match session.find_all(selector).await {
            Ok(elements) if !elements.is_empty() => {
                tracing::debug!("Found {} elements with selector: {}", elements.len(), selector);
                return Ok(elements);
            }
            Ok(_) => {}
            Err(SessionError::Closed) => return Err(SessionError::Closed),
            Err(e) => tracing::debug!("Selector {} failed: {}", selector, e),
        }
    }
    Ok(Vec::new())
}

/// Queries a prioritized selector list within one element
///
/// Same first-non-empty rule as [`query`], scoped to the element's descendants.
pub async fn query_within<E: PageElement>(element: &E, selectors: &[&str]) -> Vec<E> {
    for selector in selectors {
        match element.find_all(selector).await {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => {}
            Err(e) => tracing::debug!("Selector {} failed inside element: {}", selector, e),
        }
    }
    Vec::new()
}
