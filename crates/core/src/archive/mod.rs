//! Archiving collaborator: snapshot directories to `<hash>.tar.gz` and back.

mod tar;

pub use self::tar::TarArchiver;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while archiving or extracting.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The tar binary could not be launched.
    #[error("tar not found at path: {path}")]
    TarNotFound { path: PathBuf },

    /// Directory to archive does not exist.
    #[error("source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// No archive for the requested hash.
    #[error("archive not found: {path}")]
    ArchiveNotFound { path: PathBuf },

    /// Archive repository is missing or unreadable.
    #[error("archive repository unavailable: {reason}")]
    RepositoryUnavailable { reason: String },

    /// tar exited unsuccessfully.
    #[error("tar failed: {reason}")]
    CommandFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub fn command_failed(reason: impl Into<String>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self::CommandFailed {
            reason: reason.into(),
            stderr: if stderr.is_empty() { None } else { Some(stderr) },
        }
    }
}

/// Builds and restores content-addressed archives.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archive the content of `source` and return its content hash.
    async fn create(&self, source: &Path) -> Result<String, ArchiveError>;

    /// Extract the archive named by `content_hash` into `dest`.
    async fn extract(&self, content_hash: &str, dest: &Path) -> Result<(), ArchiveError>;

    /// Hashes of every stored archive.
    fn known_hashes(&self) -> Result<Vec<String>, ArchiveError>;
}
