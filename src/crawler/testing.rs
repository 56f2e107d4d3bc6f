//! In-process doubles for driving the pipeline and run loop in tests

use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::events::EventSink;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

type FetchResponse = Result<Option<String>, FetchError>;

/// Fetcher that replays queued responses, then repeats a fallback
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<FetchResponse>>,
    fallback: FetchResponse,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub fn always(response: FetchResponse) -> Self {
        Self::scripted(Vec::new(), response)
    }

    pub fn scripted(script: Vec<FetchResponse>, fallback: FetchResponse) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn called_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Sink that keeps everything it is told
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
    errors: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn errors_for(&self, url: &str) -> Vec<String> {
        self.errors
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn count_events_containing(&self, needle: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.contains(needle))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn event(&self, message: &str) {
        self.events.lock().unwrap().push(message.to_string());
    }

    fn error(&self, url: &str, message: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((url.to_string(), message.to_string()));
    }
}
