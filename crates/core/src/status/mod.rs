//! Status artifact describing the outcome of the latest background operation.
//!
//! The artifact is cleared before an operation is launched and written once
//! when it finishes. An empty artifact means either "nothing happened yet" or
//! "operation in flight"; callers tell them apart with the lock state.

mod file;
mod memory;
mod types;

pub use file::FileStatusStore;
pub use memory::InMemoryStatusStore;
pub use types::{ErrorKind, Operation, StatusRecord};

use thiserror::Error;

/// Errors from the status artifact backend.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("status file is not a valid record: {0}")]
    Corrupt(String),
}

/// Storage of the single status artifact.
pub trait StatusStore: Send + Sync {
    /// Empty the artifact.
    fn clear(&self) -> Result<(), StatusError>;

    /// Replace the artifact with `record`. Readers never see a partial write.
    fn write(&self, record: &StatusRecord) -> Result<(), StatusError>;

    /// Current artifact, `None` when empty.
    fn read(&self) -> Result<Option<StatusRecord>, StatusError>;
}
