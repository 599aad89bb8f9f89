//! Mock crawl controller for testing.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::crawler::{CrawlError, CrawlRequest, Crawler};

/// Mock implementation of the Crawler trait.
///
/// A started crawl stays "running" until [`MockCrawler::finish`] or `stop`.
#[derive(Debug, Default)]
pub struct MockCrawler {
    running: Arc<AtomicBool>,
    progress: Arc<AtomicI64>,
    started: Arc<RwLock<Vec<CrawlRequest>>>,
    stops: Arc<RwLock<usize>>,
    /// If set, the next start will fail with this error.
    next_error: Arc<RwLock<Option<CrawlError>>>,
}

impl MockCrawler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend a crawl is (or is not) running.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn set_progress(&self, items: i64) {
        self.progress.store(items, Ordering::SeqCst);
    }

    /// End the running crawl after `items` pages.
    pub fn finish(&self, items: i64) {
        self.set_progress(items);
        self.set_running(false);
    }

    /// Configure the next start to fail with the given error.
    pub fn set_next_error(&self, error: CrawlError) {
        *self.next_error.write().unwrap() = Some(error);
    }

    /// Requests of every crawl started so far.
    pub fn started(&self) -> Vec<CrawlRequest> {
        self.started.read().unwrap().clone()
    }

    /// Number of successful stop requests.
    pub fn stop_count(&self) -> usize {
        *self.stops.read().unwrap()
    }
}

#[async_trait]
impl Crawler for MockCrawler {
    async fn start(&self, request: &CrawlRequest) -> Result<u32, CrawlError> {
        if let Some(error) = self.next_error.write().unwrap().take() {
            return Err(error);
        }
        let mut started = self.started.write().unwrap();
        started.push(request.clone());
        self.progress.store(0, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(1000 + started.len() as u32)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) -> Result<bool, CrawlError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        *self.stops.write().unwrap() += 1;
        Ok(true)
    }

    fn progress(&self) -> i64 {
        self.progress.load(Ordering::SeqCst)
    }
}
