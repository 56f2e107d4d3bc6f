//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::state::UrlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    EventLogStore, FrontierStore, PageStore, RunStore, StorageError, StorageResult,
};
use crate::storage::{
    FrontierItem, InsertOutcome, LogEntry, LogKind, NewPage, PageRecord, RunRecord, RunStatus,
};
use crate::CrawlError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const FRONTIER_COLUMNS: &str = "id, url, scope, status, attempts, last_attempt";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlError> {
        let conn = Connection::open(path)?;

        // Several connections may share one file; wait on locks instead of
        // failing straight away with SQLITE_BUSY.
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CrawlError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Fixed-width UTC stamps, so SQL string comparison orders them in time
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now_rfc3339() -> String {
    format_timestamp(Utc::now())
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn row_to_frontier_item(row: &Row<'_>) -> rusqlite::Result<FrontierItem> {
    Ok(FrontierItem {
        id: row.get(0)?,
        url: row.get(1)?,
        scope: row.get(2)?,
        status: UrlStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(UrlStatus::Pending),
        attempts: row.get(4)?,
        last_attempt: parse_timestamp(row.get(5)?),
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        max_urls: row.get::<_, i64>(4)? as u64,
        processed: row.get::<_, i64>(5)? as u64,
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl FrontierStore for SqliteStorage {
    fn insert_url(
        &mut self,
        url: &str,
        scope: &str,
        status: UrlStatus,
    ) -> StorageResult<InsertOutcome> {
        let changed = self.conn.execute(
            "INSERT INTO frontier (url, scope, status, attempts, last_attempt, discovered_at)
             VALUES (?1, ?2, ?3, 0, NULL, ?4)
             ON CONFLICT(url) DO NOTHING",
            params![url, scope, status.to_db_string(), now_rfc3339()],
        )?;

        Ok(if changed == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyPresent
        })
    }

    fn claim_next_pending(&mut self) -> StorageResult<Option<FrontierItem>> {
        // BEGIN IMMEDIATE takes the write lock up front, so no other
        // connection can slip in between the select and the update.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidate = tx
            .query_row(
                &format!(
                    "SELECT {} FROM frontier WHERE status = ?1 ORDER BY id ASC LIMIT 1",
                    FRONTIER_COLUMNS
                ),
                params![UrlStatus::Pending.to_db_string()],
                row_to_frontier_item,
            )
            .optional()?;

        let Some(item) = candidate else {
            tx.commit()?;
            return Ok(None);
        };

        let changed = tx.execute(
            "UPDATE frontier SET status = ?1, last_attempt = ?2 WHERE id = ?3 AND status = ?4",
            params![
                UrlStatus::Processing.to_db_string(),
                now_rfc3339(),
                item.id,
                UrlStatus::Pending.to_db_string()
            ],
        )?;
        tx.commit()?;

        Ok((changed == 1).then_some(item))
    }

    fn record_attempt(&mut self, item: &FrontierItem) -> StorageResult<u32> {
        let attempts = self
            .conn
            .query_row(
                "UPDATE frontier SET attempts = attempts + 1, last_attempt = ?1
                 WHERE id = ?2 RETURNING attempts",
                params![now_rfc3339(), item.id],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;

        attempts.ok_or(StorageError::ItemNotFound(item.id))
    }

    fn mark_completed(&mut self, item: &FrontierItem) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE frontier SET status = ?1 WHERE id = ?2",
            params![UrlStatus::Completed.to_db_string(), item.id],
        )?;

        if changed == 0 {
            return Err(StorageError::ItemNotFound(item.id));
        }
        Ok(())
    }

    fn get_item(&self, url: &str) -> StorageResult<Option<FrontierItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {} FROM frontier WHERE url = ?1", FRONTIER_COLUMNS),
                params![url],
                row_to_frontier_item,
            )
            .optional()?;
        Ok(item)
    }

    fn count_by_status(&self, status: UrlStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM frontier WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn requeue_interrupted(&mut self, idle_for: Duration) -> StorageResult<u64> {
        let cutoff = chrono::Duration::from_std(idle_for)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle));
        let Some(cutoff) = cutoff else {
            return Ok(0);
        };

        let changed = self.conn.execute(
            "UPDATE frontier SET status = ?1, attempts = 0
             WHERE status = ?2 AND (last_attempt IS NULL OR last_attempt <= ?3)",
            params![
                UrlStatus::Pending.to_db_string(),
                UrlStatus::Processing.to_db_string(),
                format_timestamp(cutoff)
            ],
        )?;
        Ok(changed as u64)
    }
}

impl PageStore for SqliteStorage {
    fn save_page(&mut self, page: &NewPage) -> StorageResult<()> {
        let result = self.conn.execute(
            "INSERT INTO pages (url, html, titles, bold_texts, strong_texts, em_texts, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                page.url,
                page.html,
                serde_json::to_string(&page.titles)?,
                serde_json::to_string(&page.bold_texts)?,
                serde_json::to_string(&page.strong_texts)?,
                serde_json::to_string(&page.em_texts)?,
                now_rfc3339()
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(StorageError::DuplicateKey(page.url.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, url, html, titles, bold_texts, strong_texts, em_texts, fetched_at
                 FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, url, html, titles, bold, strong, em, fetched_at)) = row else {
            return Ok(None);
        };

        Ok(Some(PageRecord {
            id,
            url,
            html,
            titles: serde_json::from_str(&titles)?,
            bold_texts: serde_json::from_str(&bold)?,
            strong_texts: serde_json::from_str(&strong)?,
            em_texts: serde_json::from_str(&em)?,
            fetched_at,
        }))
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RunStore for SqliteStorage {
    fn create_run(&mut self, config_hash: &str, max_urls: u64) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, max_urls, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                now_rfc3339(),
                config_hash,
                max_urls as i64,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, processed: u64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, processed = ?3 WHERE id = ?4",
            params![
                RunStatus::Completed.to_db_string(),
                now_rfc3339(),
                processed as i64,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, max_urls, processed, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }
}

impl EventLogStore for SqliteStorage {
    fn append_log(&mut self, entry: &LogEntry) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO logs (kind, url, message, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.kind.to_db_string(),
                entry.url,
                entry.message,
                now_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn count_logs(&self, kind: LogKind) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM logs WHERE kind = ?1",
            params![kind.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn recent_logs(&self, limit: u32) -> StorageResult<Vec<LogEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, url, message FROM logs ORDER BY id DESC LIMIT ?1")?;

        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(LogEntry {
                    kind: LogKind::from_db_string(&row.get::<_, String>(0)?)
                        .unwrap_or(LogKind::Event),
                    url: row.get(1)?,
                    message: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
