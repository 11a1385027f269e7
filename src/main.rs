//! Jobtrawl main entry point
//!
//! This is the command-line interface for the Jobtrawl job listing crawler.

use clap::{Parser, Subcommand};
use jobtrawl::config::{credentials_from_env, load_config_with_hash, Config, SearchFilters};
use jobtrawl::crawler::{build_search_url, compact_duplicates, run_search, StopHandle};
use jobtrawl::storage::{open_store, JobStore};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Jobtrawl: a quota-bounded job listing crawler
///
/// Jobtrawl logs into a job board through a WebDriver session, walks the
/// result pages for a search, and stores every listing it has not seen
/// before in a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "jobtrawl")]
#[command(version = "1.0.0")]
#[command(about = "A quota-bounded job listing crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and crawl search results into the database
    Search {
        /// Job title keywords
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// internship, entry, associate, mid, director or executive
        #[arg(long)]
        experience: Option<String>,

        /// 24h, week or month
        #[arg(long)]
        posted: Option<String>,

        /// on-site, remote or hybrid
        #[arg(long)]
        remote: Option<String>,

        /// Salary floor, e.g. 100k
        #[arg(long)]
        salary: Option<String>,

        #[arg(long)]
        company_size: Option<String>,
    },

    /// List stored jobs, most recently scraped first
    List {
        /// Only show jobs marked as applied
        #[arg(long)]
        applied: bool,
    },

    /// Mark a stored job as applied
    Applied {
        /// Job ID as shown by `list`
        id: i64,
    },

    /// Remove duplicate jobs sharing title, company and location
    Compact,

    /// Show recent search runs
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Validate the config and print the search URL it would open
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Search {
            title,
            location,
            experience,
            posted,
            remote,
            salary,
            company_size,
        } => {
            let overrides = SearchFilters {
                job_title: title,
                location,
                experience_level: experience,
                time_posted: posted,
                remote_option: remote,
                company_size,
                salary_range: salary,
            };
            let filters = config.filters.merged_with(&overrides);
            handle_search(&config, &filters, &config_hash).await?;
        }
        Command::List { applied } => handle_list(&config, applied)?,
        Command::Applied { id } => handle_applied(&config, id)?,
        Command::Compact => handle_compact(&config)?,
        Command::Runs { limit } => handle_runs(&config, limit)?,
        Command::Check => handle_check(&config)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jobtrawl=info,warn"),
            1 => EnvFilter::new("jobtrawl=debug,info"),
            2 => EnvFilter::new("jobtrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the search command
async fn handle_search(
    config: &Config,
    filters: &SearchFilters,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = match credentials_from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    let stop = StopHandle::new();
    let on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            on_signal.stop();
        }
    });

    match run_search(config, filters, &credentials, config_hash, Some(&stop)).await {
        Ok(outcome) => {
            println!("\n=== Search Completed ===");
            println!("Stopped: {}", outcome.stop_reason);
            println!("Pages processed: {}", outcome.pages_processed);
            println!(
                "Jobs saved: {} (target {})",
                outcome.total_saved, config.search.max_jobs_per_search
            );
            println!(
                "Duplicates skipped: {}, errors: {}",
                outcome.stats.duplicates, outcome.stats.errors
            );
            for job in &outcome.saved {
                println!("  [{}] {} at {} ({})", job.id, job.title, job.company, job.location);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Search failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the list command
fn handle_list(config: &Config, applied_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let jobs = store.list_all()?;

    let mut shown = 0;
    for job in jobs.iter().filter(|job| !applied_only || job.applied) {
        let marker = if job.applied { "✓" } else { " " };
        println!(
            "{} [{}] {} at {} ({})",
            marker, job.id, job.title, job.company, job.location
        );
        println!("      {}", job.url);
        shown += 1;
    }

    println!("\n{} of {} jobs shown", shown, jobs.len());
    Ok(())
}

/// Handles the applied command
fn handle_applied(config: &Config, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(Path::new(&config.output.database_path))?;

    if store.mark_applied(id)? {
        println!("✓ Job {} marked as applied", id);
        Ok(())
    } else {
        tracing::error!("No job with ID {}", id);
        Err(format!("no job with ID {}", id).into())
    }
}

/// Handles the compact command
fn handle_compact(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(Path::new(&config.output.database_path))?;
    let removed = compact_duplicates(&mut store)?;
    println!("✓ Removed {} duplicate jobs", removed);
    Ok(())
}

/// Handles the runs command
fn handle_runs(config: &Config, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(Path::new(&config.output.database_path))?;

    println!("Database: {}\n", config.output.database_path);
    for run in store.latest_runs(limit)? {
        println!(
            "Run {} [{}] started {} - {} pages, {} saved, stopped: {}",
            run.id,
            run.status.to_db_string(),
            run.started_at,
            run.pages_processed,
            run.saved,
            run.stop_reason.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Handles the check command: validates config and shows what would be searched
fn handle_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Jobtrawl Config Check ===\n");

    println!("Browser:");
    println!("  WebDriver: {}", config.browser.webdriver_url);
    println!("  Headless: {}", config.browser.headless);

    println!("\nSearch:");
    println!("  Quota: {}", config.search.max_jobs_per_search);
    println!("  Page cap: {}", config.search.page_cap);
    println!("  Empty page grace: {}", config.search.empty_page_grace);
    println!(
        "  Delay between requests: {}ms",
        config.search.delay_between_requests
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let url = build_search_url(&config.site.base_url, &config.filters)?;
    println!("\n✓ Configuration is valid");
    println!("✓ Would open: {}", url);

    Ok(())
}
