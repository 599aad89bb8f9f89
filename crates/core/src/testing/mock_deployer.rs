//! Mock deployer for testing.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::deploy::{DeployError, Deployer};

/// Mock implementation of the Deployer trait.
///
/// Records deployed hashes and can be told to fail.
#[derive(Debug, Default)]
pub struct MockDeployer {
    deployed: Arc<RwLock<Vec<String>>>,
    /// If set, the next deploy will fail with this error.
    next_error: Arc<RwLock<Option<DeployError>>>,
}

impl MockDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next deploy to fail with the given error.
    pub fn set_next_error(&self, error: DeployError) {
        *self.next_error.write().unwrap() = Some(error);
    }

    /// Configure the next deploy to fail like a script exiting with 1.
    pub fn fail_next(&self) {
        self.set_next_error(DeployError::ScriptFailed { code: Some(1) });
    }

    /// Hashes successfully deployed so far.
    pub fn deployed(&self) -> Vec<String> {
        self.deployed.read().unwrap().clone()
    }
}

#[async_trait]
impl Deployer for MockDeployer {
    async fn deploy(&self, content_hash: &str) -> Result<(), DeployError> {
        if let Some(error) = self.next_error.write().unwrap().take() {
            return Err(error);
        }
        self.deployed.write().unwrap().push(content_hash.to_string());
        Ok(())
    }
}
