//! Deployment collaborator: pushes an archived statification to production.

mod script;

pub use script::ScriptDeployer;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while deploying.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The interpreter could not be launched.
    #[error("deploy interpreter not found: {path}")]
    InterpreterNotFound { path: PathBuf },

    /// The deployment script does not exist.
    #[error("deploy script not found: {path}")]
    ScriptNotFound { path: PathBuf },

    /// The script exited unsuccessfully.
    #[error("deploy script failed with exit code {code:?}")]
    ScriptFailed { code: Option<i32> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque production deployment step.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, content_hash: &str) -> Result<(), DeployError>;
}
