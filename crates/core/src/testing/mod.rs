//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external collaborators
//! (archiving, deployment, crawl), allowing lifecycle tests without `tar`,
//! deploy scripts or a crawler.
//!
//! # Example
//!
//! ```rust,ignore
//! use statif_core::testing::{MockArchiver, MockCrawler, MockDeployer};
//!
//! let archiver = MockArchiver::new();
//! archiver.add_archive(&"a".repeat(40));
//!
//! let crawler = MockCrawler::new();
//! crawler.set_running(true);
//! ```

mod mock_archiver;
mod mock_crawler;
mod mock_deployer;

pub use mock_archiver::{MockArchiver, EXTRACTED_MARKER};
pub use mock_crawler::MockCrawler;
pub use mock_deployer::MockDeployer;

use std::sync::Arc;

use crate::config::PathsConfig;
use crate::lifecycle::{create_lifecycle, Collaborators, LifecycleService};
use crate::lock::InMemoryLockManager;
use crate::statification::SqliteConnector;
use crate::status::InMemoryStatusStore;

/// Lifecycle service wired to in-memory lock/status and mock collaborators.
///
/// The job worker is spawned on the current runtime. The database is a file
/// under the root so jobs can open their own connection.
pub struct TestLifecycle {
    pub service: Arc<LifecycleService>,
    pub paths: PathsConfig,
    pub lock: Arc<InMemoryLockManager>,
    pub status: Arc<InMemoryStatusStore>,
    pub connector: Arc<SqliteConnector>,
    pub archiver: Arc<MockArchiver>,
    pub deployer: Arc<MockDeployer>,
    pub crawler: Arc<MockCrawler>,
}

impl TestLifecycle {
    /// Build the service with every path rooted at `root`.
    pub fn new(root: &std::path::Path) -> Self {
        let paths = PathsConfig::rooted_at(root);
        let lock = Arc::new(InMemoryLockManager::new());
        let status = Arc::new(InMemoryStatusStore::new());
        let connector = Arc::new(SqliteConnector::new(root.join("statif.db")));
        let archiver = Arc::new(MockArchiver::new());
        let deployer = Arc::new(MockDeployer::new());
        let crawler = Arc::new(MockCrawler::new());

        let (service, worker) = create_lifecycle(
            paths.clone(),
            Collaborators {
                lock: lock.clone(),
                status: status.clone(),
                connector: connector.clone(),
                archiver: archiver.clone(),
                deployer: deployer.clone(),
                crawler: crawler.clone(),
            },
            4,
        )
        .expect("failed to create test lifecycle");
        tokio::spawn(worker.run());

        Self {
            service: Arc::new(service),
            paths,
            lock,
            status,
            connector,
            archiver,
            deployer,
            crawler,
        }
    }

    /// Wait until no job holds the lock.
    pub async fn wait_idle(&self) {
        use crate::lock::LockManager;

        for _ in 0..200 {
            if !self.lock.is_locked().unwrap_or(true) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("background job did not finish");
    }
}
