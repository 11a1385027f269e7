use crate::config::types::{
    BrowserConfig, Config, LoginConfig, OutputConfig, SearchConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_browser_config(&config.browser)?;
    validate_site_config(&config.site)?;
    validate_search_config(&config.search)?;
    validate_login_config(&config.login)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.webdriver_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "webdriver-url must use http or https, got '{}'",
            config.webdriver_url
        )));
    }

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates the crawl budget
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.max_jobs_per_search < 1 || config.max_jobs_per_search > 1000 {
        return Err(ConfigError::Validation(format!(
            "max-jobs-per-search must be between 1 and 1000, got {}",
            config.max_jobs_per_search
        )));
    }

    if config.page_cap < 1 || config.page_cap > 100 {
        return Err(ConfigError::Validation(format!(
            "page-cap must be between 1 and 100, got {}",
            config.page_cap
        )));
    }

    Ok(())
}

fn validate_login_config(config: &LoginConfig) -> Result<(), ConfigError> {
    if config.poll_interval == 0 {
        return Err(ConfigError::Validation(
            "login poll-interval must be > 0".to_string(),
        ));
    }

    if config.poll_interval > config.timeout {
        return Err(ConfigError::Validation(format!(
            "login poll-interval ({}ms) cannot exceed timeout ({}ms)",
            config.poll_interval, config.timeout
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
