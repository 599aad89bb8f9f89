//! Lifecycle error type and its mapping to the reported error kinds.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::crawler::CrawlError;
use crate::deploy::DeployError;
use crate::lock::LockError;
use crate::statification::StoreError;
use crate::status::{ErrorKind, StatusError};
use crate::validation::ValidationError;

/// Everything that can go wrong in a lifecycle operation.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a crawl is already running")]
    AlreadyRunning,

    #[error("another operation holds the lock")]
    LockUnavailable,

    #[error("failed to prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("crawl log not found: {path}")]
    MissingLog { path: PathBuf },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LifecycleError {
    pub fn prepare(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Prepare {
            path: path.into(),
            source,
        }
    }

    /// Category reported to callers and written to the status artifact.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Validation(_) | LifecycleError::InvalidInput(_) => {
                ErrorKind::InvalidInput
            }
            LifecycleError::AlreadyRunning => ErrorKind::AlreadyRunning,
            LifecycleError::LockUnavailable => ErrorKind::LockUnavailable,
            LifecycleError::Prepare { .. } => ErrorKind::SubprocessFailure,
            LifecycleError::MissingLog { .. } => ErrorKind::MissingArtifact,
            LifecycleError::Archive(e) => match e {
                ArchiveError::SourceNotFound { .. } | ArchiveError::ArchiveNotFound { .. } => {
                    ErrorKind::MissingArtifact
                }
                ArchiveError::RepositoryUnavailable { .. } => ErrorKind::InvalidInput,
                ArchiveError::TarNotFound { .. }
                | ArchiveError::CommandFailed { .. }
                | ArchiveError::Io(_) => ErrorKind::SubprocessFailure,
            },
            LifecycleError::Deploy(_) | LifecycleError::Crawl(_) => ErrorKind::SubprocessFailure,
            LifecycleError::Store(_) => ErrorKind::StoreInconsistency,
            LifecycleError::Lock(_) | LifecycleError::Status(_) | LifecycleError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}
