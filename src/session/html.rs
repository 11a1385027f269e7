//! Replay session over captured HTML pages
//!
//! Pages are registered by URL and served from memory. Elements are addressed
//! by their child-index path from the document root and resolved against a
//! fresh parse on every call, so nothing borrowed from the parsed document is
//! held across an await point.
//!
//! Interaction is modelled only as far as the crawler needs it:
//! - `click` follows the element's `href` or `data-href`, otherwise it is a no-op
//! - an element is hidden when it or an ancestor carries `hidden`,
//!   `aria-hidden="true"` or an inline `display: none`
//! - an element is disabled when it carries `disabled` or `aria-disabled="true"`
//! - elements of a page that is no longer current are stale

use crate::session::{BrowserSession, PageElement, SessionError, SessionResult};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

#[derive(Default)]
struct ReplayState {
    pages: HashMap<String, Arc<str>>,
    current: Option<String>,
    visits: Vec<String>,
    typed: Vec<(String, String)>,
    closed: bool,
}

impl ReplayState {
    fn open(&mut self, url: &str) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        if !self.pages.contains_key(url) {
            return Err(SessionError::UnknownPage(url.to_string()));
        }
        self.current = Some(url.to_string());
        self.visits.push(url.to_string());
        Ok(())
    }

    fn current_page(&self) -> SessionResult<(String, Arc<str>)> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let url = self
            .current
            .clone()
            .ok_or_else(|| SessionError::UnknownPage("about:blank".to_string()))?;
        let source = self
            .pages
            .get(&url)
            .cloned()
            .ok_or_else(|| SessionError::UnknownPage(url.clone()))?;
        Ok((url, source))
    }
}

/// A browser session that replays captured pages
#[derive(Clone, Default)]
pub struct HtmlSession {
    state: Arc<Mutex<ReplayState>>,
}

impl HtmlSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the page served for `url`
    pub fn add_page(&self, url: &str, html: &str) {
        self.lock().pages.insert(url.to_string(), Arc::from(html));
    }

    /// Builder form of [`HtmlSession::add_page`]
    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.add_page(url, html);
        self
    }

    /// Every URL successfully loaded, in order, including loads caused by clicks
    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    /// Text typed into the element with the given `id` or `name`
    pub fn typed_into(&self, field: &str) -> Option<String> {
        self.lock()
            .typed
            .iter()
            .rev()
            .find(|(name, _)| name == field)
            .map(|(_, text)| text.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BrowserSession for HtmlSession {
    type Element = HtmlElement;

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.lock().open(url)
    }

    async fn current_url(&self) -> SessionResult<String> {
        self.lock().current_page().map(|(url, _)| url)
    }

    async fn page_source(&self) -> SessionResult<String> {
        self.lock().current_page().map(|(_, source)| source.to_string())
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<HtmlElement>> {
        let (url, source) = self.lock().current_page()?;
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&source);

        let elements = document
            .select(&selector)
            .map(|element| HtmlElement {
                state: Arc::clone(&self.state),
                url: url.clone(),
                source: Arc::clone(&source),
                path: node_path(element),
            })
            .collect();

        Ok(elements)
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.lock().closed = true;
        Ok(())
    }
}

/// An element of a replayed page
#[derive(Clone)]
pub struct HtmlElement {
    state: Arc<Mutex<ReplayState>>,
    url: String,
    source: Arc<str>,
    path: Vec<usize>,
}

impl HtmlElement {
    fn lock(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_attached(&self) -> SessionResult<()> {
        let state = self.lock();
        if state.closed {
            return Err(SessionError::Closed);
        }
        if state.current.as_deref() != Some(self.url.as_str()) {
            return Err(SessionError::StaleElement);
        }
        Ok(())
    }

    /// Runs `f` against this element in a fresh parse of its page
    fn with_element<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> SessionResult<T> {
        self.ensure_attached()?;
        let document = Html::parse_document(&self.source);
        let element = resolve_path(&document, &self.path).ok_or(SessionError::StaleElement)?;
        Ok(f(element))
    }
}

#[async_trait]
impl PageElement for HtmlElement {
    async fn text(&self) -> SessionResult<String> {
        self.with_element(|element| {
            element
                .text()
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    async fn attribute(&self, name: &str) -> SessionResult<Option<String>> {
        self.with_element(|element| element.value().attr(name).map(str::to_string))
    }

    async fn click(&self) -> SessionResult<()> {
        let target = self.with_element(|element| {
            element
                .value()
                .attr("href")
                .or_else(|| element.value().attr("data-href"))
                .map(str::to_string)
        })?;

        let Some(target) = target else {
            return Ok(());
        };

        let absolute = match Url::parse(&self.url).and_then(|base| base.join(&target)) {
            Ok(url) => url.to_string(),
            Err(_) => target,
        };

        self.lock().open(&absolute)
    }

    async fn is_enabled(&self) -> SessionResult<bool> {
        self.with_element(|element| {
            let value = element.value();
            value.attr("disabled").is_none() && value.attr("aria-disabled") != Some("true")
        })
    }

    async fn is_displayed(&self) -> SessionResult<bool> {
        self.with_element(|element| {
            let hidden_self = is_hidden(element);
            let hidden_ancestor = element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(is_hidden);
            !hidden_self && !hidden_ancestor
        })
    }

    async fn send_keys(&self, text: &str) -> SessionResult<()> {
        let field = self.with_element(|element| {
            let value = element.value();
            value
                .attr("id")
                .or_else(|| value.attr("name"))
                .unwrap_or_default()
                .to_string()
        })?;
        self.lock().typed.push((field, text.to_string()));
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<HtmlElement>> {
        let selector = parse_selector(selector)?;
        let paths = self.with_element(|element| {
            element
                .select(&selector)
                .filter(|found| found.id() != element.id())
                .map(node_path)
                .collect::<Vec<_>>()
        })?;

        Ok(paths
            .into_iter()
            .map(|path| HtmlElement {
                state: Arc::clone(&self.state),
                url: self.url.clone(),
                source: Arc::clone(&self.source),
                path,
            })
            .collect())
    }
}

fn parse_selector(selector: &str) -> SessionResult<Selector> {
    Selector::parse(selector).map_err(|_| SessionError::InvalidSelector(selector.to_string()))
}

/// Child-index path from the document root down to the element
fn node_path(element: ElementRef<'_>) -> Vec<usize> {
    let mut path = Vec::new();
    let mut node = *element;
    while let Some(parent) = node.parent() {
        path.push(node.prev_siblings().count());
        node = parent;
    }
    path.reverse();
    path
}

fn resolve_path<'a>(document: &'a Html, path: &[usize]) -> Option<ElementRef<'a>> {
    let mut node = document.tree.root();
    for &index in path {
        node = node.children().nth(index)?;
    }
    ElementRef::wrap(node)
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value
        .attr("style")
        .map(|style| style.replace(' ', "").contains("display:none"))
        .unwrap_or(false)
}
