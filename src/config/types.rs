use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for scopecrawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Fetch attempts per claimed URL before it is abandoned
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay between attempts after a network failure (seconds)
    #[serde(rename = "retry-delay-secs")]
    pub retry_delay_secs: u64,

    /// Sleep when the frontier has no pending URL (seconds)
    #[serde(rename = "idle-backoff-secs")]
    pub idle_backoff_secs: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Age of the last attempt after which a processing URL counts as
    /// abandoned by a dead process (seconds)
    #[serde(rename = "recover-after-secs")]
    pub recover_after_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_secs: 60,
            idle_backoff_secs: 10,
            fetch_timeout_secs: 10,
            recover_after_secs: 600,
        }
    }
}

impl CrawlerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            idle_backoff: Duration::from_secs(self.idle_backoff_secs),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn recover_after(&self) -> Duration {
        Duration::from_secs(self.recover_after_secs)
    }

    /// Twice the longest gap between two attempt stamps of a live run loop
    ///
    /// A live loop stamps `last_attempt` on claim and on every attempt, so a
    /// processing URL idle for longer than this has no live owner.
    pub fn min_recover_after_secs(&self) -> u64 {
        self.retry_delay_secs
            .saturating_add(self.fetch_timeout_secs)
            .saturating_mul(2)
    }
}

/// Retry and backoff timings used by the run loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub idle_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        CrawlerConfig::default().retry_policy()
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "scopecrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "./scopecrawl.db".to_string(),
        }
    }
}
