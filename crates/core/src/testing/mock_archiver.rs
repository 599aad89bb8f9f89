//! Mock archiver for testing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::archive::{ArchiveError, Archiver};

/// File written into the destination of an extraction, holding the hash.
pub const EXTRACTED_MARKER: &str = ".extracted-archive";

/// Mock implementation of the Archiver trait.
///
/// Provides controllable behavior for testing:
/// - Track created and extracted archives for assertions
/// - Choose the hash of the next archive
/// - Simulate failures and panics
#[derive(Debug)]
pub struct MockArchiver {
    /// Hashes of archives that "exist".
    known: Arc<RwLock<Vec<String>>>,
    /// Source directories passed to `create`.
    created: Arc<RwLock<Vec<PathBuf>>>,
    /// (hash, destination) passed to `extract`.
    extracted: Arc<RwLock<Vec<(String, PathBuf)>>>,
    /// Hash returned by the next `create`.
    next_hash: Arc<RwLock<Option<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ArchiveError>>>,
    /// If set, the next operation panics.
    panic_next: Arc<AtomicBool>,
    counter: AtomicU64,
}

impl Default for MockArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArchiver {
    pub fn new() -> Self {
        Self {
            known: Arc::new(RwLock::new(Vec::new())),
            created: Arc::new(RwLock::new(Vec::new())),
            extracted: Arc::new(RwLock::new(Vec::new())),
            next_hash: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            panic_next: Arc::new(AtomicBool::new(false)),
            counter: AtomicU64::new(0),
        }
    }

    /// Register an existing archive.
    pub fn add_archive(&self, content_hash: &str) {
        let mut known = self.known.write().unwrap();
        if !known.iter().any(|h| h == content_hash) {
            known.push(content_hash.to_string());
        }
    }

    /// Hash returned by the next `create` (default: a generated 40-char hex hash).
    pub fn set_next_hash(&self, content_hash: &str) {
        *self.next_hash.write().unwrap() = Some(content_hash.to_string());
    }

    /// Configure the next operation to fail with the given error.
    pub fn set_next_error(&self, error: ArchiveError) {
        *self.next_error.write().unwrap() = Some(error);
    }

    /// Configure the next operation to panic.
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    /// Source directories archived so far.
    pub fn created_sources(&self) -> Vec<PathBuf> {
        self.created.read().unwrap().clone()
    }

    /// Extractions performed so far.
    pub fn extracted(&self) -> Vec<(String, PathBuf)> {
        self.extracted.read().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), ArchiveError> {
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("mock archiver panic");
        }
        match self.next_error.write().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Archiver for MockArchiver {
    async fn create(&self, source: &Path) -> Result<String, ArchiveError> {
        self.check_failure()?;
        if !source.is_dir() {
            return Err(ArchiveError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        let content_hash = self.next_hash.write().unwrap().take().unwrap_or_else(|| {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            format!("{:040x}", n)
        });

        self.created.write().unwrap().push(source.to_path_buf());
        self.add_archive(&content_hash);
        Ok(content_hash)
    }

    async fn extract(&self, content_hash: &str, dest: &Path) -> Result<(), ArchiveError> {
        self.check_failure()?;
        if !self.known.read().unwrap().iter().any(|h| h == content_hash) {
            return Err(ArchiveError::ArchiveNotFound {
                path: PathBuf::from(format!("{}.tar.gz", content_hash)),
            });
        }

        tokio::fs::create_dir_all(dest).await?;
        tokio::fs::write(dest.join(EXTRACTED_MARKER), content_hash).await?;
        self.extracted
            .write()
            .unwrap()
            .push((content_hash.to_string(), dest.to_path_buf()));
        Ok(())
    }

    fn known_hashes(&self) -> Result<Vec<String>, ArchiveError> {
        Ok(self.known.read().unwrap().clone())
    }
}
