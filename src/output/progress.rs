//! Terminal progress bar for a crawl run

use crate::crawler::{CrawlProgress, ProgressObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}";

/// Drives a progress bar from the run loop's budget updates
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Creates a visible bar sized to the run's budget
    pub fn new(max_urls: u64) -> Self {
        let bar = ProgressBar::new(max_urls);
        match ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            Ok(style) => bar.set_style(
                style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▓░"),
            ),
            Err(e) => tracing::warn!("Invalid progress bar template: {}", e),
        }
        bar.set_message("URLs");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Creates a reporter that tracks progress without drawing
    pub fn hidden(max_urls: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(max_urls);
        Self { bar }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, progress: &CrawlProgress) {
        self.bar.set_position(progress.processed);
        self.bar.finish_with_message("done");
    }
}

impl ProgressObserver for ProgressReporter {
    fn on_item_processed(&self, progress: &CrawlProgress) {
        self.bar.set_position(progress.processed);
    }
}
