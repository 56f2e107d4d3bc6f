//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with classified network failures
//! - HTML parsing, metadata extraction and scoped link discovery
//! - The per-item pipeline and the retrying run loop

mod coordinator;
mod fetcher;
mod parser;
mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Coordinator, ProgressObserver};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, Fetcher, HttpFetcher};
pub use parser::{extract_links, extract_metadata, PageMetadata};
pub use pipeline::{AttemptError, AttemptOutcome, CrawlProgress, Pipeline};

use crate::config::Config;
use crate::events::{EventSink, StorageSink};
use crate::state::UrlStatus;
use crate::storage::{open_storage, FrontierStore, InsertOutcome};
use crate::{CrawlError, UrlError};
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;

/// Adds a seed URL to the frontier as pending
///
/// The URL must be absolute http(s) and the scope non-empty. It is stored in
/// its parsed form, the same form discovered links take, so
/// `https://example.com` and a later `href="/"` name one frontier row.
/// Seeding a URL that is already known changes nothing.
///
/// # Example
///
/// ```
/// use scopecrawl::seed_url;
/// use scopecrawl::storage::SqliteStorage;
///
/// let mut storage = SqliteStorage::new_in_memory().unwrap();
/// let outcome = seed_url(&mut storage, "https://example.com/", "https://example.com").unwrap();
/// assert!(outcome.is_inserted());
/// ```
pub fn seed_url<S: FrontierStore>(
    storage: &mut S,
    url: &str,
    scope: &str,
) -> Result<InsertOutcome, CrawlError> {
    let url = url.trim();
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string()).into()),
    }

    let scope = scope.trim();
    if scope.is_empty() {
        return Err(UrlError::EmptyScope.into());
    }

    Ok(storage.insert_url(parsed.as_str(), scope, UrlStatus::Pending)?)
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the store at `database_path`
/// 2. Optionally requeue items left in processing by an interrupted run
/// 3. Build the HTTP fetcher from the configuration
/// 4. Run the loop until `max_urls` units of budget are spent
///
/// # Example
///
/// ```no_run
/// use scopecrawl::config::load_config_with_hash;
/// use scopecrawl::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(None)?;
/// let progress = run_crawl(&config, &hash, Path::new("crawl.db"), 10, false, None).await?;
/// println!("{} processed", progress.processed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    database_path: &Path,
    max_urls: u64,
    recover: bool,
    observer: Option<&dyn ProgressObserver>,
) -> Result<CrawlProgress, CrawlError> {
    let storage = Arc::new(Mutex::new(open_storage(database_path)?));
    let sink: Arc<dyn EventSink> = Arc::new(StorageSink::new(storage.clone()));
    let fetcher = HttpFetcher::from_config(&config.crawler, &config.user_agent)?;

    let coordinator = Coordinator::new(storage, fetcher, sink, config.crawler.retry_policy())
        .with_config_hash(config_hash);

    if recover {
        let recovered = coordinator.recover_interrupted(config.crawler.recover_after())?;
        tracing::info!("{} interrupted URLs returned to the queue", recovered);
    }

    Ok(coordinator.run(max_urls, observer).await)
}
