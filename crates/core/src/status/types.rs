use std::fmt;

use serde::{Deserialize, Serialize};

/// Background operation reported by the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Archive,
    Deploy,
    Visualize,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Archive => "archive",
            Operation::Deploy => "deploy",
            Operation::Visualize => "visualize",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of failure categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Empty actor or designation, malformed or unknown content hash.
    InvalidInput,
    /// A crawl or conflicting operation is in progress.
    AlreadyRunning,
    /// Another critical operation holds the lock.
    LockUnavailable,
    /// An external process failed or produced no usable result.
    SubprocessFailure,
    /// An expected log or archive file is absent.
    MissingArtifact,
    /// A record that should exist was not found.
    StoreInconsistency,
    /// A job ended without reporting, e.g. it panicked.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::AlreadyRunning => "already_running",
            ErrorKind::LockUnavailable => "lock_unavailable",
            ErrorKind::SubprocessFailure => "subprocess_failure",
            ErrorKind::MissingArtifact => "missing_artifact",
            ErrorKind::StoreInconsistency => "store_inconsistency",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat record persisted as the status artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub success: bool,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Content hash of the affected statification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl StatusRecord {
    pub fn succeeded(operation: Operation, sha: impl Into<String>) -> Self {
        Self {
            success: true,
            operation,
            error: None,
            sha: Some(sha.into()),
        }
    }

    pub fn failed(operation: Operation, error: ErrorKind, sha: Option<String>) -> Self {
        Self {
            success: false,
            operation,
            error: Some(error),
            sha,
        }
    }
}
