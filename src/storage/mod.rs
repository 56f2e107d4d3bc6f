//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - The URL frontier and its claim/complete lifecycle
//! - Captured page content
//! - Run tracking and the event/error audit log

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{
    EventLogStore, FrontierStore, PageStore, RunStore, Storage, StorageError, StorageResult,
};

use crate::state::UrlStatus;
use crate::CrawlError;
use chrono::{DateTime, Utc};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(CrawlError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CrawlError> {
    SqliteStorage::new(path)
}

/// A URL known to the crawler
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierItem {
    pub id: i64,
    pub url: String,
    pub scope: String,
    pub status: UrlStatus,
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
}

/// Result of inserting a URL into the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was created
    Inserted,
    /// The URL was already known; nothing was modified
    AlreadyPresent,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Content captured from a fetched page, ready to be stored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPage {
    pub url: String,
    pub html: String,
    pub titles: Vec<String>,
    pub bold_texts: Vec<String>,
    pub strong_texts: Vec<String>,
    pub em_texts: Vec<String>,
}

/// A stored page
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub html: String,
    pub titles: Vec<String>,
    pub bold_texts: Vec<String>,
    pub strong_texts: Vec<String>,
    pub em_texts: Vec<String>,
    pub fetched_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub max_urls: u64,
    pub processed: u64,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Kind of audit log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Event,
    Error,
}

impl LogKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Error => "error",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "event" => Some(Self::Event),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A row of the audit log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub url: Option<String>,
    pub message: String,
}
