//! Crawl controller: starts, observes and stops the external crawl process.

mod process;

pub use process::ProcessCrawler;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the crawl controller.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The crawl program could not be launched.
    #[error("crawl program not found: {path}")]
    ProgramNotFound { path: PathBuf },

    /// The crawl log file could not be opened.
    #[error("failed to open crawl log {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal crawl process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata handed to a new crawl.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub designation: String,
    pub description: String,
    pub actor: String,
}

/// Handle on the external crawl process.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Launch a detached crawl. Returns its process id.
    async fn start(&self, request: &CrawlRequest) -> Result<u32, CrawlError>;

    /// Whether the recorded crawl process is alive.
    fn is_running(&self) -> bool;

    /// Ask the running crawl to terminate. Returns `false` when none runs.
    fn stop(&self) -> Result<bool, CrawlError>;

    /// Pages crawled so far by the current (or last) crawl.
    fn progress(&self) -> i64;
}
