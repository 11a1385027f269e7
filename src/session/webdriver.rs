//! Live browser session over WebDriver
//!
//! Connects to an already running WebDriver server (for example
//! `chromedriver --port=9515`). Driver discovery and installation are left to
//! the host.

use crate::config::BrowserConfig;
use crate::session::{BrowserSession, PageElement, SessionError, SessionResult};
use async_trait::async_trait;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

/// Hides the automation flag some sites check before serving content
const HIDE_WEBDRIVER_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

/// A browser session driven through WebDriver
pub struct WebDriverSession {
    driver: Option<WebDriver>,
}

impl WebDriverSession {
    /// Opens a new browser session
    ///
    /// Failing to acquire a session is the one fatal condition of a crawl, so
    /// this error is returned to the caller unchanged.
    pub async fn connect(config: &BrowserConfig) -> SessionResult<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.set_headless()?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_arg("--disable-blink-features=AutomationControlled")?;

        tracing::info!("Connecting to WebDriver at {}", config.webdriver_url);
        let driver = WebDriver::new(config.webdriver_url.as_str(), caps).await?;

        if let Err(e) = driver.execute(HIDE_WEBDRIVER_SCRIPT, Vec::new()).await {
            tracing::debug!("Could not hide webdriver flag: {}", e);
        }

        Ok(Self {
            driver: Some(driver),
        })
    }

    fn driver(&self) -> SessionResult<&WebDriver> {
        self.driver.as_ref().ok_or(SessionError::Closed)
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    type Element = DriverElement;

    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.driver()?.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        let url = self.driver()?.current_url().await?;
        Ok(url.to_string())
    }

    async fn page_source(&self) -> SessionResult<String> {
        Ok(self.driver()?.source().await?)
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<DriverElement>> {
        let elements = self.driver()?.find_all(By::Css(selector)).await?;
        Ok(elements.into_iter().map(DriverElement).collect())
    }

    async fn close(&mut self) -> SessionResult<()> {
        match self.driver.take() {
            Some(driver) => {
                driver.quit().await?;
                tracing::debug!("Browser session closed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// An element of a live page
pub struct DriverElement(WebElement);

#[async_trait]
impl PageElement for DriverElement {
    async fn text(&self) -> SessionResult<String> {
        Ok(self.0.text().await?)
    }

    async fn attribute(&self, name: &str) -> SessionResult<Option<String>> {
        Ok(self.0.attr(name).await?)
    }

    async fn click(&self) -> SessionResult<()> {
        self.0.click().await?;
        Ok(())
    }

    async fn is_enabled(&self) -> SessionResult<bool> {
        Ok(self.0.is_enabled().await?)
    }

    async fn is_displayed(&self) -> SessionResult<bool> {
        Ok(self.0.is_displayed().await?)
    }

    async fn send_keys(&self, text: &str) -> SessionResult<()> {
        self.0.send_keys(text).await?;
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<DriverElement>> {
        let elements = self.0.find_all(By::Css(selector)).await?;
        Ok(elements.into_iter().map(DriverElement).collect())
    }
}
