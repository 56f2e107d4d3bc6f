//! scopecrawl main entry point
//!
//! This is the command-line interface for the scopecrawl scope-bounded crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use scopecrawl::config::{load_config_with_hash, Config};
use scopecrawl::crawler::run_crawl;
use scopecrawl::output::{load_statistics, print_statistics, ProgressReporter};
use scopecrawl::seed_url;
use scopecrawl::storage::open_storage;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// scopecrawl: a scope-bounded web crawler
///
/// scopecrawl fetches pages from a persistent frontier, stores their headings
/// and emphasis text, and follows only links that start with the scope the
/// page was seeded under.
#[derive(Parser, Debug)]
#[command(name = "scopecrawl")]
#[command(version)]
#[command(about = "A scope-bounded web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// SQLite database path, overriding the configuration
    #[arg(short, long, value_name = "FILE", global = true)]
    database: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed a URL to crawl, limited to links starting with SCOPE
    AddUrl {
        url: Option<String>,
        scope: Option<String>,
    },

    /// Crawl until the URL budget is spent
    Scrape {
        /// Budget of pages processed plus links queued
        #[arg(long, default_value_t = 10)]
        max_urls: u64,

        /// Requeue URLs left in processing by an interrupted run first
        #[arg(long)]
        recover: bool,
    },

    /// Show statistics from the database and exit
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("Failed to load configuration")?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    let database_path = cli
        .database
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.database_path));

    match cli.command {
        Command::AddUrl { url, scope } => handle_add_url(&database_path, url, scope),
        Command::Scrape { max_urls, recover } => {
            let reporter = if cli.quiet {
                ProgressReporter::hidden(max_urls)
            } else {
                ProgressReporter::new(max_urls)
            };
            handle_scrape(
                &config,
                &config_hash,
                &database_path,
                max_urls,
                recover,
                &reporter,
            )
            .await
        }
        Command::Stats => handle_stats(&database_path),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scopecrawl=info,warn"),
            1 => EnvFilter::new("scopecrawl=debug,info"),
            2 => EnvFilter::new("scopecrawl=trace,debug"),
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

/// Handles `add-url`: seeds one URL with its scope
fn handle_add_url(
    database_path: &Path,
    url: Option<String>,
    scope: Option<String>,
) -> anyhow::Result<()> {
    let (Some(url), Some(scope)) = (url, scope) else {
        println!("Usage: scopecrawl add-url <URL> <SCOPE>");
        println!("Example: scopecrawl add-url https://example.com/docs/ https://example.com/docs");
        return Ok(());
    };

    let mut storage = open_storage(database_path)
        .with_context(|| format!("Failed to open database {}", database_path.display()))?;

    let outcome = seed_url(&mut storage, &url, &scope)
        .with_context(|| format!("Failed to add {}", url))?;

    if outcome.is_inserted() {
        println!("Added {} (scope: {})", url, scope);
    } else {
        println!("{} is already known, nothing changed", url);
    }

    Ok(())
}

/// Handles `scrape`: runs the crawl loop
async fn handle_scrape(
    config: &Config,
    config_hash: &str,
    database_path: &Path,
    max_urls: u64,
    recover: bool,
    reporter: &ProgressReporter,
) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling up to {} URLs into {}",
        max_urls,
        database_path.display()
    );

    let progress = run_crawl(
        config,
        config_hash,
        database_path,
        max_urls,
        recover,
        Some(reporter),
    )
    .await
    .context("Crawl failed")?;
    reporter.finish(&progress);

    tracing::info!(
        "Crawl completed: {}/{} URLs processed",
        progress.processed,
        progress.max_urls
    );

    Ok(())
}

/// Handles `stats`: shows statistics from the database
fn handle_stats(database_path: &Path) -> anyhow::Result<()> {
    println!("Database: {}\n", database_path.display());

    let storage = open_storage(database_path)
        .with_context(|| format!("Failed to open database {}", database_path.display()))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}
