//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::UrlStatus;
use crate::storage::{LogEntry, LogKind, RunRecord, Storage};
use crate::CrawlError;
use std::collections::HashMap;

const RECENT_LOG_LIMIT: u32 = 10;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Count of frontier items by status
    pub frontier_by_status: HashMap<UrlStatus, u64>,

    /// Number of stored pages
    pub total_pages: u64,

    pub event_count: u64,
    pub error_count: u64,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Newest audit log entries, newest first
    pub recent_logs: Vec<LogEntry>,
}

impl CrawlStatistics {
    /// Total number of URLs known to the frontier
    pub fn total_urls(&self) -> u64 {
        self.frontier_by_status.values().sum()
    }

    pub fn count(&self, status: UrlStatus) -> u64 {
        self.frontier_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics<S: Storage>(storage: &S) -> Result<CrawlStatistics, CrawlError> {
    let mut frontier_by_status = HashMap::new();
    for status in UrlStatus::all_statuses() {
        frontier_by_status.insert(status, storage.count_by_status(status)?);
    }

    Ok(CrawlStatistics {
        frontier_by_status,
        total_pages: storage.count_pages()?,
        event_count: storage.count_logs(LogKind::Event)?,
        error_count: storage.count_logs(LogKind::Error)?,
        latest_run: storage.get_latest_run()?,
        recent_logs: storage.recent_logs(RECENT_LOG_LIMIT)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Frontier:");
    println!("  Total URLs: {}", stats.total_urls());
    for status in UrlStatus::all_statuses() {
        let count = stats.count(status);
        let percentage = if stats.total_urls() > 0 {
            (count as f64 / stats.total_urls() as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Pages stored: {}", stats.total_pages);
    println!(
        "Log entries: {} events, {} errors",
        stats.event_count, stats.error_count
    );
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest run #{}:", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Processed: {} / {}", run.processed, run.max_urls);
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No crawl runs recorded"),
    }

    if !stats.recent_logs.is_empty() {
        println!("\nRecent log entries:");
        for entry in &stats.recent_logs {
            match (&entry.kind, &entry.url) {
                (LogKind::Error, Some(url)) => println!("  [error] {}: {}", url, entry.message),
                (LogKind::Error, None) => println!("  [error] {}", entry.message),
                (LogKind::Event, _) => println!("  [event] {}", entry.message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        EventLogStore, FrontierStore, NewPage, PageStore, RunStore, SqliteStorage,
    };

    #[test]
    fn test_statistics_on_empty_store() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_urls(), 0);
        assert_eq!(stats.total_pages, 0);
        assert!(stats.latest_run.is_none());
        assert!(stats.recent_logs.is_empty());
    }

    #[test]
    fn test_statistics_counts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .insert_url("https://example.com/a", "https://example.com", UrlStatus::Pending)
            .unwrap();
        storage
            .insert_url("https://example.com/b", "https://example.com", UrlStatus::Pending)
            .unwrap();
        let item = storage.claim_next_pending().unwrap().unwrap();
        storage.mark_completed(&item).unwrap();
        storage
            .save_page(&NewPage {
                url: item.url.clone(),
                html: "<p>x</p>".to_string(),
                ..Default::default()
            })
            .unwrap();
        let run_id = storage.create_run("abc", 10).unwrap();
        storage.complete_run(run_id, 1).unwrap();
        storage
            .append_log(&LogEntry {
                kind: LogKind::Error,
                url: Some(item.url.clone()),
                message: "boom".to_string(),
            })
            .unwrap();

        let stats = load_statistics(&storage).unwrap();

        assert_eq!(stats.total_urls(), 2);
        assert_eq!(stats.count(UrlStatus::Pending), 1);
        assert_eq!(stats.count(UrlStatus::Completed), 1);
        assert_eq!(stats.count(UrlStatus::Processing), 0);
        assert_eq!(stats.total_pages, 1);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.event_count, 0);
        assert_eq!(stats.latest_run.unwrap().processed, 1);
    }
}
