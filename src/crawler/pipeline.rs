//! Per-item crawl pipeline
//!
//! One attempt on a claimed URL: fetch, extract, persist, discover links,
//! enqueue them and complete the item. The pipeline never retries; it
//! reports network failures to the caller and leaves the retry policy to
//! the run loop.

use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::parser::{extract_links, extract_metadata};
use crate::events::EventSink;
use crate::state::UrlStatus;
use crate::storage::{FrontierItem, FrontierStore, NewPage, PageStore};
use crate::CrawlError;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use url::Url;

/// Budget accounting for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlProgress {
    /// Pages completed plus links newly enqueued
    pub processed: u64,
    pub max_urls: u64,
}

impl CrawlProgress {
    pub fn new(max_urls: u64) -> Self {
        Self {
            processed: 0,
            max_urls,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.processed >= self.max_urls
    }

    pub fn remaining(&self) -> u64 {
        self.max_urls.saturating_sub(self.processed)
    }

    /// Whether another discovered link may be enqueued
    ///
    /// One unit of budget stays reserved for the page being processed, so a
    /// run never ends above `max_urls`.
    fn has_room_for_link(&self) -> bool {
        self.remaining() > 1
    }
}

/// Why a pipeline attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    /// Fetch failed at the network layer; worth another attempt
    #[error(transparent)]
    Network(#[from] FetchError),

    /// Anything else; the item should be completed without retrying
    #[error(transparent)]
    Unexpected(#[from] CrawlError),
}

/// How an attempt ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Budget was already spent; nothing was touched
    Skipped,
    /// The server returned no content; the item was completed without a page
    Abandoned,
    /// The page was captured and the item completed
    Processed,
}

pub(crate) fn lock<S>(storage: &Mutex<S>) -> Result<MutexGuard<'_, S>, CrawlError> {
    storage.lock().map_err(|_| CrawlError::LockPoisoned)
}

/// Marks an item completed, reporting instead of failing
pub(crate) fn complete_item<S: FrontierStore>(
    storage: &Mutex<S>,
    sink: &dyn EventSink,
    item: &FrontierItem,
) {
    let result =
        lock(storage).and_then(|mut storage| storage.mark_completed(item).map_err(Into::into));

    match result {
        Ok(()) => sink.event(&format!("URL status set to completed: {}", item.url)),
        Err(e) => sink.error(
            &item.url,
            &format!("Failed to set URL status to completed: {}", e),
        ),
    }
}

/// Runs single attempts against shared storage
pub struct Pipeline<'a, S, F: ?Sized> {
    storage: &'a Mutex<S>,
    fetcher: &'a F,
    sink: &'a dyn EventSink,
}

impl<'a, S, F> Pipeline<'a, S, F>
where
    S: FrontierStore + PageStore,
    F: Fetcher + ?Sized,
{
    pub fn new(storage: &'a Mutex<S>, fetcher: &'a F, sink: &'a dyn EventSink) -> Self {
        Self {
            storage,
            fetcher,
            sink,
        }
    }

    /// Runs one attempt on a claimed item
    ///
    /// `progress` is updated in place, so links enqueued before a later
    /// failure still count against the budget.
    pub async fn run_attempt(
        &self,
        item: &FrontierItem,
        progress: &mut CrawlProgress,
    ) -> Result<AttemptOutcome, AttemptError> {
        if progress.is_exhausted() {
            return Ok(AttemptOutcome::Skipped);
        }

        let page_url = Url::parse(&item.url).map_err(CrawlError::from)?;

        let Some(html) = self.fetcher.fetch(&item.url).await? else {
            self.sink
                .event(&format!("No content returned, abandoning URL: {}", item.url));
            complete_item(self.storage, self.sink, item);
            return Ok(AttemptOutcome::Abandoned);
        };
        self.sink
            .event(&format!("Page fetched successfully: {}", item.url));

        let metadata = extract_metadata(&html);
        let page = NewPage {
            url: item.url.clone(),
            html,
            titles: metadata.titles,
            bold_texts: metadata.bold_texts,
            strong_texts: metadata.strong_texts,
            em_texts: metadata.em_texts,
        };
        self.persist(&page)?;

        let links = extract_links(&page.html, &page_url, &item.scope);
        self.enqueue_links(item, &links, progress)?;

        complete_item(self.storage, self.sink, item);
        progress.processed += 1;

        Ok(AttemptOutcome::Processed)
    }

    fn persist(&self, page: &NewPage) -> Result<(), AttemptError> {
        let result = lock(self.storage)?.save_page(page);

        match result {
            Ok(()) => {
                self.sink
                    .event(&format!("Page data saved for URL: {}", page.url));
                Ok(())
            }
            Err(e) if e.is_duplicate_key() => {
                self.sink
                    .error(&page.url, &format!("Page data already stored: {}", e));
                Ok(())
            }
            Err(e) => Err(CrawlError::from(e).into()),
        }
    }

    fn enqueue_links(
        &self,
        item: &FrontierItem,
        links: &[String],
        progress: &mut CrawlProgress,
    ) -> Result<(), AttemptError> {
        for (index, link) in links.iter().enumerate() {
            if !progress.has_room_for_link() {
                self.sink.event(&format!(
                    "Budget reached, dropping {} remaining links from {}",
                    links.len() - index,
                    item.url
                ));
                break;
            }

            let outcome = lock(self.storage)?
                .insert_url(link, &item.scope, UrlStatus::Pending)
                .map_err(CrawlError::from)?;

            if outcome.is_inserted() {
                progress.processed += 1;
                self.sink.event(&format!("New URL queued: {}", link));
            }
        }
        Ok(())
    }
}
