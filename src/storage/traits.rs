//! Storage traits and error types
//!
//! The crawler talks to persistence only through these traits, so a run loop
//! can be driven against any backend that honours their contracts.

use crate::state::UrlStatus;
use crate::storage::{
    FrontierItem, InsertOutcome, LogEntry, LogKind, NewPage, PageRecord, RunRecord,
};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Frontier item not found: {0}")]
    ItemNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true if this is a unique-key collision
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistent queue of URLs with a uniqueness guarantee on `url`
pub trait FrontierStore {
    /// Inserts a URL unless it is already known
    ///
    /// Uniqueness is enforced by the store itself, so concurrent inserts of
    /// the same URL leave exactly one row carrying the first insert's fields.
    fn insert_url(&mut self, url: &str, scope: &str, status: UrlStatus)
        -> StorageResult<InsertOutcome>;

    /// Atomically claims the oldest pending URL
    ///
    /// The claimed row moves to `Processing` with `last_attempt` stamped.
    /// The returned item is the snapshot taken before the transition.
    fn claim_next_pending(&mut self) -> StorageResult<Option<FrontierItem>>;

    /// Records a fetch attempt, returning the new attempt count
    fn record_attempt(&mut self, item: &FrontierItem) -> StorageResult<u32>;

    /// Marks a URL as completed (idempotent)
    fn mark_completed(&mut self, item: &FrontierItem) -> StorageResult<()>;

    /// Gets a frontier item by URL
    fn get_item(&self, url: &str) -> StorageResult<Option<FrontierItem>>;

    /// Counts frontier items in a status
    fn count_by_status(&self, status: UrlStatus) -> StorageResult<u64>;

    /// Resets items stuck in `Processing` back to `Pending`
    ///
    /// Only items whose last attempt is at least `idle_for` old are touched,
    /// so URLs a live run loop is still working on keep their claim.
    /// Returns the number of items recovered.
    fn requeue_interrupted(&mut self, idle_for: Duration) -> StorageResult<u64>;
}

/// Persistent store of captured pages, keyed uniquely by URL
pub trait PageStore {
    /// Saves a page; fails with `DuplicateKey` if the URL already has one
    fn save_page(&mut self, page: &NewPage) -> StorageResult<()>;

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;
}

/// Bookkeeping for crawl runs
pub trait RunStore {
    /// Creates a new run and returns its ID
    fn create_run(&mut self, config_hash: &str, max_urls: u64) -> StorageResult<i64>;

    /// Marks a run as completed with its final processed count
    fn complete_run(&mut self, run_id: i64, processed: u64) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}

/// Append-only audit log of crawl events and errors
pub trait EventLogStore {
    fn append_log(&mut self, entry: &LogEntry) -> StorageResult<()>;

    fn count_logs(&self, kind: LogKind) -> StorageResult<u64>;

    /// Gets the most recent entries, newest first
    fn recent_logs(&self, limit: u32) -> StorageResult<Vec<LogEntry>>;
}

/// Everything a run loop needs from its backend
pub trait Storage: FrontierStore + PageStore + RunStore + EventLogStore {}

impl<T: FrontierStore + PageStore + RunStore + EventLogStore> Storage for T {}
