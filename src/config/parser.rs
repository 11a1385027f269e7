use crate::config::types::{Config, Credentials};
use crate::config::validation::validate;
use crate::{ConfigError, TrawlError};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable holding the login email
pub const EMAIL_VAR: &str = "JOBTRAWL_EMAIL";

/// Environment variable holding the login password
pub const PASSWORD_VAR: &str = "JOBTRAWL_PASSWORD";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is stored with every search run so runs made under different
/// budgets can be told apart.
///
/// # Arguments
///
/// * `path` - Path to the configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 digest of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Validated configuration and the file's digest
/// * `Err(ConfigError)` - Failed to load, parse, validate, or hash the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Reads login credentials from the environment
///
/// A `.env` file in the working directory is loaded first when present.
pub fn credentials_from_env() -> Result<Credentials, TrawlError> {
    dotenvy::dotenv().ok();

    let email = std::env::var(EMAIL_VAR).unwrap_or_default();
    let password = std::env::var(PASSWORD_VAR).unwrap_or_default();

    if email.trim().is_empty() || password.is_empty() {
        return Err(TrawlError::Credentials(format!(
            "set {} and {} (environment or .env file)",
            EMAIL_VAR, PASSWORD_VAR
        )));
    }

    Ok(Credentials { email, password })
}
