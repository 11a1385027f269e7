use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Jobtrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub login: LoginConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub filters: SearchFilters,
}

/// WebDriver connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Endpoint of a running WebDriver server (chromedriver)
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a visible window
    #[serde(default)]
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: false,
        }
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the job board
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Crawl budget and pacing. All delays are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Per-run quota of newly persisted listings
    #[serde(default = "default_quota")]
    pub max_jobs_per_search: u32,

    /// Hard upper bound on result pages processed in one run
    #[serde(default = "default_page_cap")]
    pub page_cap: u32,

    /// Page number below which an empty result page is treated as a render gap
    #[serde(default = "default_empty_page_grace")]
    pub empty_page_grace: u32,

    #[serde(default = "default_request_delay")]
    pub delay_between_requests: u64,

    #[serde(default = "default_initial_load")]
    pub initial_load: u64,

    #[serde(default = "default_page_settle")]
    pub page_settle: u64,

    #[serde(default = "default_empty_page_retry")]
    pub empty_page_retry: u64,

    #[serde(default = "default_recovery_delay")]
    pub recovery_delay: u64,

    #[serde(default = "default_detail_settle")]
    pub detail_settle: u64,
}

impl SearchConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests)
    }

    pub fn initial_load_delay(&self) -> Duration {
        Duration::from_millis(self.initial_load)
    }

    pub fn page_settle_delay(&self) -> Duration {
        Duration::from_millis(self.page_settle)
    }

    pub fn empty_page_retry_delay(&self) -> Duration {
        Duration::from_millis(self.empty_page_retry)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay)
    }

    pub fn detail_settle_delay(&self) -> Duration {
        Duration::from_millis(self.detail_settle)
    }

    /// Same budget with every delay set to zero. Used for replayed pages.
    pub fn without_delays(&self) -> Self {
        Self {
            delay_between_requests: 0,
            initial_load: 0,
            page_settle: 0,
            empty_page_retry: 0,
            recovery_delay: 0,
            detail_settle: 0,
            ..self.clone()
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_jobs_per_search: default_quota(),
            page_cap: default_page_cap(),
            empty_page_grace: default_empty_page_grace(),
            delay_between_requests: default_request_delay(),
            initial_load: default_initial_load(),
            page_settle: default_page_settle(),
            empty_page_retry: default_empty_page_retry(),
            recovery_delay: default_recovery_delay(),
            detail_settle: default_detail_settle(),
        }
    }
}

/// Authentication polling configuration (milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoginConfig {
    /// Total time to wait for the authenticated landing page
    #[serde(default = "default_login_timeout")]
    pub timeout: u64,

    #[serde(default = "default_login_poll")]
    pub poll_interval: u64,

    /// Time allowed for the login form to appear
    #[serde(default = "default_form_timeout")]
    pub form_timeout: u64,
}

impl LoginConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn form_timeout(&self) -> Duration {
        Duration::from_millis(self.form_timeout)
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            timeout: default_login_timeout(),
            poll_interval: default_login_poll(),
            form_timeout: default_form_timeout(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Search filters used to build the initial results URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchFilters {
    pub job_title: Option<String>,
    pub location: Option<String>,
    pub experience_level: Option<String>,
    pub time_posted: Option<String>,
    pub remote_option: Option<String>,
    pub company_size: Option<String>,
    pub salary_range: Option<String>,
}

impl SearchFilters {
    /// Overlays every field that is set in `other` onto a copy of `self`
    pub fn merged_with(&self, other: &SearchFilters) -> SearchFilters {
        fn pick(over: &Option<String>, base: &Option<String>) -> Option<String> {
            over.clone().or_else(|| base.clone())
        }

        SearchFilters {
            job_title: pick(&other.job_title, &self.job_title),
            location: pick(&other.location, &self.location),
            experience_level: pick(&other.experience_level, &self.experience_level),
            time_posted: pick(&other.time_posted, &self.time_posted),
            remote_option: pick(&other.remote_option, &self.remote_option),
            company_size: pick(&other.company_size, &self.company_size),
            salary_range: pick(&other.salary_range, &self.salary_range),
        }
    }
}

/// Login credentials. Never read from the config file.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_base_url() -> String {
    "https://www.linkedin.com".to_string()
}

fn default_quota() -> u32 {
    50
}

fn default_page_cap() -> u32 {
    25
}

fn default_empty_page_grace() -> u32 {
    10
}

fn default_request_delay() -> u64 {
    3000
}

fn default_initial_load() -> u64 {
    5000
}

fn default_page_settle() -> u64 {
    3000
}

fn default_empty_page_retry() -> u64 {
    2000
}

fn default_recovery_delay() -> u64 {
    3000
}

fn default_detail_settle() -> u64 {
    2000
}

fn default_login_timeout() -> u64 {
    120_000
}

fn default_login_poll() -> u64 {
    5000
}

fn default_form_timeout() -> u64 {
    15_000
}
