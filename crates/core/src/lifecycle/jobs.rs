//! Bodies of the three background jobs.
//!
//! Each job opens its own store connection, performs its external step,
//! applies the status transitions and records one lifecycle event. Reporting
//! and lock release are the executor's business.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::{workspace, LifecycleError};
use crate::archive::Archiver;
use crate::config::PathsConfig;
use crate::deploy::Deployer;
use crate::statification::{
    LifecycleAction, Statification, StatificationStatus, StatificationStore, StoreConnector,
    StoreError,
};
use crate::status::Operation;

/// A lifecycle-mutating operation queued for background execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Archive the in-progress statification.
    Archive { actor: String },
    /// Push an archived statification to production.
    Deploy { actor: String, content_hash: String },
    /// Extract an archived statification for preview.
    Visualize { actor: String, content_hash: String },
}

impl Job {
    pub fn operation(&self) -> Operation {
        match self {
            Job::Archive { .. } => Operation::Archive,
            Job::Deploy { .. } => Operation::Deploy,
            Job::Visualize { .. } => Operation::Visualize,
        }
    }

    pub fn actor(&self) -> &str {
        match self {
            Job::Archive { actor } | Job::Deploy { actor, .. } | Job::Visualize { actor, .. } => {
                actor
            }
        }
    }

    /// Hash the job targets, when known before it runs.
    pub fn target_hash(&self) -> Option<&str> {
        match self {
            Job::Archive { .. } => None,
            Job::Deploy { content_hash, .. } | Job::Visualize { content_hash, .. } => {
                Some(content_hash.as_str())
            }
        }
    }
}

/// Runs job bodies against the collaborators.
pub struct JobRunner {
    paths: PathsConfig,
    connector: Arc<dyn StoreConnector>,
    archiver: Arc<dyn Archiver>,
    deployer: Arc<dyn Deployer>,
}

impl JobRunner {
    pub fn new(
        paths: PathsConfig,
        connector: Arc<dyn StoreConnector>,
        archiver: Arc<dyn Archiver>,
        deployer: Arc<dyn Deployer>,
    ) -> Self {
        Self {
            paths,
            connector,
            archiver,
            deployer,
        }
    }

    /// Run `job` to completion. Returns the hash of the affected statification.
    pub async fn run(&self, job: &Job) -> Result<String, LifecycleError> {
        let store = self.connector.connect()?;

        match job {
            Job::Archive { actor } => self.archive(store.as_ref(), actor).await,
            Job::Deploy {
                actor,
                content_hash,
            } => self.deploy(store.as_ref(), actor, content_hash).await,
            Job::Visualize {
                actor,
                content_hash,
            } => self.visualize(store.as_ref(), actor, content_hash).await,
        }
    }

    async fn archive(
        &self,
        store: &dyn StatificationStore,
        actor: &str,
    ) -> Result<String, LifecycleError> {
        let current = store
            .get_by_hash("")?
            .ok_or_else(|| StoreError::NotFound("in-progress statification".to_string()))?;

        info!(statification_id = current.id, "Creating statification archive");
        let content_hash = self.archiver.create(&self.paths.static_repository).await?;

        info!(hash = %content_hash, "Renaming crawl log after archive hash");
        let archived_log = self.archived_log_path(&content_hash);
        tokio::fs::rename(&self.paths.log_file, &archived_log)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LifecycleError::MissingLog {
                        path: self.paths.log_file.clone(),
                    }
                } else {
                    LifecycleError::prepare(&archived_log, e)
                }
            })?;

        info!(hash = %content_hash, "Registering archive hash");
        store.update_hash("", &content_hash)?;
        store.update_status(&content_hash, StatificationStatus::Saved)?;
        store.append_event(current.id, actor, LifecycleAction::SaveStatification)?;

        info!(hash = %content_hash, "Statification saved");
        Ok(content_hash)
    }

    async fn deploy(
        &self,
        store: &dyn StatificationStore,
        actor: &str,
        content_hash: &str,
    ) -> Result<String, LifecycleError> {
        let target = Self::require(store, content_hash)?;

        self.deployer.deploy(content_hash).await?;

        Self::demote_holder(store, StatificationStatus::Production)?;
        store.update_status(content_hash, StatificationStatus::Production)?;
        store.append_event(target.id, actor, LifecycleAction::PushToProduction)?;

        info!(hash = %content_hash, "Statification pushed to production");
        Ok(content_hash.to_string())
    }

    async fn visualize(
        &self,
        store: &dyn StatificationStore,
        actor: &str,
        content_hash: &str,
    ) -> Result<String, LifecycleError> {
        let target = Self::require(store, content_hash)?;

        info!(dir = %self.paths.visualize_repository.display(), "Cleaning visualize repository");
        workspace::clean_directory(&self.paths.visualize_repository).await?;
        self.archiver
            .extract(content_hash, &self.paths.visualize_repository)
            .await?;

        Self::demote_holder(store, StatificationStatus::Visualized)?;
        store.update_status(content_hash, StatificationStatus::Visualized)?;
        store.append_event(target.id, actor, LifecycleAction::VisualizeStatification)?;

        info!(hash = %content_hash, "Statification opened for visualization");
        Ok(content_hash.to_string())
    }

    fn require(
        store: &dyn StatificationStore,
        content_hash: &str,
    ) -> Result<Statification, LifecycleError> {
        store
            .get_by_hash(content_hash)?
            .ok_or_else(|| StoreError::NotFound(content_hash.to_string()).into())
    }

    /// Move the current holder of `status` back to SAVED. No holder is fine.
    fn demote_holder(
        store: &dyn StatificationStore,
        status: StatificationStatus,
    ) -> Result<(), LifecycleError> {
        info!(%status, "Demoting previous holder");
        let demoted = store.switch_status(status, StatificationStatus::Saved)?;
        if demoted == 0 {
            info!(%status, "No previous holder to demote");
        }
        Ok(())
    }

    fn archived_log_path(&self, content_hash: &str) -> PathBuf {
        self.paths.log_dir.join(format!("{}.log", content_hash))
    }
}
