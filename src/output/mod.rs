//! Output module for reporting on a crawl database
//!
//! Statistics are read back from the store; nothing here writes to it.
//! A progress bar reports a live run on the terminal.

mod progress;
pub mod stats;

pub use progress::ProgressReporter;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
