//! Configuration module for Jobtrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and reading login credentials from the environment.
//!
//! # Example
//!
//! ```no_run
//! use jobtrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("jobtrawl.toml")).unwrap();
//! println!("Quota per search: {}", config.search.max_jobs_per_search);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, Credentials, LoginConfig, OutputConfig, SearchConfig, SearchFilters,
    SiteConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, credentials_from_env, load_config, load_config_with_hash, EMAIL_VAR,
    PASSWORD_VAR,
};
