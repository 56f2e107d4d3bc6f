//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that drives a crawl:
//! - Claiming pending URLs from the shared frontier
//! - Running the per-item pipeline under a bounded retry policy
//! - Backing off when the frontier is empty
//! - Tracking the run's budget and recording the run itself

use crate::config::RetryPolicy;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pipeline::{complete_item, lock, AttemptError, CrawlProgress, Pipeline};
use crate::events::EventSink;
use crate::storage::{FrontierItem, Storage};
use crate::CrawlError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FRONTIER_LABEL: &str = "frontier";

/// Receives the budget state after each item that finished an attempt cleanly
pub trait ProgressObserver {
    fn on_item_processed(&self, progress: &CrawlProgress);
}

impl<F: Fn(&CrawlProgress)> ProgressObserver for F {
    fn on_item_processed(&self, progress: &CrawlProgress) {
        self(progress)
    }
}

/// Main crawler coordinator structure
///
/// Several coordinators may share one store; the store's atomic claim keeps
/// them from working on the same URL.
pub struct Coordinator<S, F> {
    storage: Arc<Mutex<S>>,
    fetcher: F,
    sink: Arc<dyn EventSink>,
    policy: RetryPolicy,
    config_hash: String,
}

impl<S, F> Coordinator<S, F>
where
    S: Storage + Send,
    F: Fetcher,
{
    pub fn new(
        storage: Arc<Mutex<S>>,
        fetcher: F,
        sink: Arc<dyn EventSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            storage,
            fetcher,
            sink,
            policy,
            config_hash: String::new(),
        }
    }

    /// Sets the configuration hash recorded with each run
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Puts items left in `Processing` by an interrupted run back in the queue
    ///
    /// Items attempted within the last `idle_for` are left alone; another
    /// loop sharing the store may still be working on them.
    pub fn recover_interrupted(&self, idle_for: Duration) -> Result<u64, CrawlError> {
        let recovered = lock(&self.storage)?.requeue_interrupted(idle_for)?;
        if recovered > 0 {
            self.sink
                .event(&format!("Recovered {} interrupted URLs", recovered));
        }
        Ok(recovered)
    }

    /// Runs the main crawl loop until `max_urls` units of budget are spent
    ///
    /// An empty frontier is waited out with the idle backoff rather than
    /// ending the run, so the loop only returns once the budget is exhausted.
    /// Failures are reported through the sink and never end the run.
    pub async fn run(
        &self,
        max_urls: u64,
        observer: Option<&dyn ProgressObserver>,
    ) -> CrawlProgress {
        let run_id = self.start_run(max_urls);
        let mut progress = CrawlProgress::new(max_urls);

        while !progress.is_exhausted() {
            match self.claim_next() {
                Some(item) => {
                    self.process_item(&item, &mut progress, observer).await;
                }
                None => {
                    self.sink.event("No pending URL found, waiting...");
                    tokio::time::sleep(self.policy.idle_backoff).await;
                }
            }

            self.sink.event(&format!(
                "{}/{} URLs processed so far",
                progress.processed, max_urls
            ));
        }

        self.sink
            .event(&format!("Finished processing {} URLs", progress.processed));
        self.finish_run(run_id, &progress);

        progress
    }

    /// Processes one claimed item under the retry policy
    ///
    /// Network failures are retried after `retry_delay` until `max_attempts`
    /// attempts were made; the item is then completed without a page. Any
    /// other failure completes the item at once. The observer is notified
    /// only when an attempt finishes cleanly.
    pub async fn process_item(
        &self,
        item: &FrontierItem,
        progress: &mut CrawlProgress,
        observer: Option<&dyn ProgressObserver>,
    ) {
        let pipeline = Pipeline::new(self.storage.as_ref(), &self.fetcher, self.sink.as_ref());
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            self.record_attempt(item);

            match pipeline.run_attempt(item, progress).await {
                Ok(outcome) => {
                    tracing::debug!("{} finished as {:?}", item.url, outcome);
                    if let Some(observer) = observer {
                        observer.on_item_processed(progress);
                    }
                    return;
                }
                Err(AttemptError::Network(e)) => {
                    self.sink
                        .error(&item.url, &format!("Request error ({}): {}", e.kind(), e));

                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.retry_delay).await;
                        self.sink.event(&format!(
                            "Retrying... attempt {}/{} for URL: {}",
                            attempt + 1,
                            max_attempts,
                            item.url
                        ));
                    }
                }
                Err(AttemptError::Unexpected(e)) => {
                    self.sink
                        .error(&item.url, &format!("Unexpected error: {}", e));
                    complete_item(self.storage.as_ref(), self.sink.as_ref(), item);
                    return;
                }
            }
        }

        self.sink
            .event(&format!("Maximum attempts reached for URL: {}", item.url));
        complete_item(self.storage.as_ref(), self.sink.as_ref(), item);
    }

    /// Claims the next pending item; store failures read as an empty frontier
    fn claim_next(&self) -> Option<FrontierItem> {
        let result = lock(&self.storage)
            .and_then(|mut storage| storage.claim_next_pending().map_err(Into::into));

        match result {
            Ok(Some(item)) => {
                self.sink
                    .event(&format!("URL claimed for processing: {}", item.url));
                Some(item)
            }
            Ok(None) => None,
            Err(e) => {
                self.sink.error(
                    FRONTIER_LABEL,
                    &format!("Failed to claim a pending URL: {}", e),
                );
                None
            }
        }
    }

    fn record_attempt(&self, item: &FrontierItem) {
        let result = lock(&self.storage)
            .and_then(|mut storage| storage.record_attempt(item).map_err(Into::into));

        match result {
            Ok(attempts) => tracing::debug!("Attempt {} on {}", attempts, item.url),
            Err(e) => self
                .sink
                .error(&item.url, &format!("Failed to record attempt: {}", e)),
        }
    }

    fn start_run(&self, max_urls: u64) -> Option<i64> {
        let result = lock(&self.storage).and_then(|mut storage| {
            storage
                .create_run(&self.config_hash, max_urls)
                .map_err(Into::into)
        });

        match result {
            Ok(run_id) => {
                tracing::info!("Starting crawl run {} (max {} URLs)", run_id, max_urls);
                Some(run_id)
            }
            Err(e) => {
                tracing::warn!("Failed to record crawl run: {}", e);
                None
            }
        }
    }

    fn finish_run(&self, run_id: Option<i64>, progress: &CrawlProgress) {
        let Some(run_id) = run_id else {
            return;
        };

        let result = lock(&self.storage).and_then(|mut storage| {
            storage
                .complete_run(run_id, progress.processed)
                .map_err(Into::into)
        });

        if let Err(e) = result {
            tracing::warn!("Failed to close crawl run {}: {}", run_id, e);
        }
    }
}
