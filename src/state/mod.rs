//! State module for tracking crawl progress
//!
//! `UrlStatus` tracks where a frontier URL is in its lifecycle.

mod url_status;

pub use url_status::UrlStatus;
