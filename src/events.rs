//! Event and error reporting for crawl runs
//!
//! The run loop reports what it does through an [`EventSink`]. Sinks are
//! fire-and-forget: reporting never returns an error, so a broken sink can
//! not abort a crawl.

use crate::storage::{EventLogStore, LogEntry, LogKind};
use std::sync::{Arc, Mutex};

/// One-way reporter for crawl events and per-URL errors
pub trait EventSink: Send + Sync {
    /// Reports a general crawl event
    fn event(&self, message: &str);

    /// Reports a failure concerning one URL
    fn error(&self, url: &str, message: &str);
}

/// Sink that only emits `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn event(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, url: &str, message: &str) {
        tracing::error!(url = %url, "{}", message);
    }
}

/// Sink that appends to the store's audit log and mirrors to `tracing`
pub struct StorageSink<S> {
    storage: Arc<Mutex<S>>,
}

impl<S> StorageSink<S> {
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }
}

impl<S: EventLogStore + Send> StorageSink<S> {
    fn append(&self, entry: LogEntry) {
        let result = match self.storage.lock() {
            Ok(mut storage) => storage.append_log(&entry).map_err(|e| e.to_string()),
            Err(_) => Err("storage lock poisoned".to_string()),
        };

        if let Err(e) = result {
            tracing::warn!("Failed to write audit log entry: {}", e);
        }
    }
}

impl<S: EventLogStore + Send> EventSink for StorageSink<S> {
    fn event(&self, message: &str) {
        TracingSink.event(message);
        self.append(LogEntry {
            kind: LogKind::Event,
            url: None,
            message: message.to_string(),
        });
    }

    fn error(&self, url: &str, message: &str) {
        TracingSink.error(url, message);
        self.append(LogEntry {
            kind: LogKind::Error,
            url: Some(url.to_string()),
            message: message.to_string(),
        });
    }
}
