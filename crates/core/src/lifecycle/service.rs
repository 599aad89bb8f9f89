//! Lifecycle service: admission of operations and read-side queries.
//!
//! Mutating operations are validated synchronously, admitted under the
//! exclusive lock and handed to the job executor. The caller gets an
//! acknowledgement and polls [`LifecycleService::status`] for the outcome.

use std::sync::Arc;

use tracing::{info, warn};

use super::executor::{create_job_system, JobHandle, JobWorker};
use super::jobs::{Job, JobRunner};
use super::{workspace, LifecycleError, StatificationInfo, StatusView};
use crate::archive::Archiver;
use crate::config::PathsConfig;
use crate::crawler::{CrawlRequest, Crawler};
use crate::deploy::Deployer;
use crate::lock::{LockGuard, LockManager};
use crate::metrics;
use crate::statification::{
    CreateStatificationRequest, LifecycleAction, Statification, StatificationFilter,
    StatificationStatus, StatificationStore, StoreConnector, StoreError,
};
use crate::status::StatusStore;
use crate::validation::{validate_content_hash, validate_designation, validate_user};

/// Actor recorded for transitions nobody requested explicitly.
pub const SYSTEM_ACTOR: &str = "system";

/// External collaborators of the lifecycle service.
#[derive(Clone)]
pub struct Collaborators {
    pub lock: Arc<dyn LockManager>,
    pub status: Arc<dyn StatusStore>,
    pub connector: Arc<dyn StoreConnector>,
    pub archiver: Arc<dyn Archiver>,
    pub deployer: Arc<dyn Deployer>,
    pub crawler: Arc<dyn Crawler>,
}

/// Orchestrates the lifecycle of statifications.
pub struct LifecycleService {
    paths: PathsConfig,
    store: Arc<dyn StatificationStore>,
    lock: Arc<dyn LockManager>,
    status: Arc<dyn StatusStore>,
    archiver: Arc<dyn Archiver>,
    crawler: Arc<dyn Crawler>,
    jobs: JobHandle,
}

/// Wire a lifecycle service and its job worker.
///
/// The worker must be spawned with `tokio::spawn(worker.run())`.
pub fn create_lifecycle(
    paths: PathsConfig,
    collaborators: Collaborators,
    queue_capacity: usize,
) -> Result<(LifecycleService, JobWorker), LifecycleError> {
    let store: Arc<dyn StatificationStore> = Arc::from(collaborators.connector.connect()?);

    let runner = JobRunner::new(
        paths.clone(),
        Arc::clone(&collaborators.connector),
        Arc::clone(&collaborators.archiver),
        collaborators.deployer,
    );
    let (jobs, worker) = create_job_system(
        runner,
        Arc::clone(&collaborators.lock),
        Arc::clone(&collaborators.status),
        queue_capacity,
    );

    let service = LifecycleService {
        paths,
        store,
        lock: collaborators.lock,
        status: collaborators.status,
        archiver: collaborators.archiver,
        crawler: collaborators.crawler,
        jobs,
    };
    Ok((service, worker))
}

fn rejected(operation: &str, error: LifecycleError) -> LifecycleError {
    warn!(operation, kind = %error.kind(), error = %error, "Operation rejected");
    metrics::OPERATIONS_REJECTED
        .with_label_values(&[operation, error.kind().as_str()])
        .inc();
    error
}

impl LifecycleService {
    // =========================================================================
    // Mutating operations
    // =========================================================================

    /// Prepare the working directories and launch a new crawl.
    pub async fn start_crawl(
        &self,
        actor: &str,
        designation: &str,
        description: &str,
    ) -> Result<Statification, LifecycleError> {
        self.do_start_crawl(actor, designation, description)
            .await
            .map_err(|e| rejected("crawl", e))
    }

    async fn do_start_crawl(
        &self,
        actor: &str,
        designation: &str,
        description: &str,
    ) -> Result<Statification, LifecycleError> {
        validate_user(actor)?;
        validate_designation(designation)?;

        if self.crawler.is_running() {
            return Err(LifecycleError::AlreadyRunning);
        }
        if self.store.get_by_hash("")?.is_some() {
            // The previous statification must be archived first.
            return Err(LifecycleError::AlreadyRunning);
        }

        if !self.lock.try_acquire()? {
            return Err(LifecycleError::LockUnavailable);
        }
        let _guard = LockGuard::new(self.lock.as_ref());

        self.status.clear()?;
        workspace::clean_directory(&self.paths.static_repository).await?;
        workspace::ensure_directory(&self.paths.log_dir).await?;
        workspace::remove_if_exists(&self.paths.log_file).await?;

        // No record exists until the crawl process does.
        let pid = self
            .crawler
            .start(&CrawlRequest {
                designation: designation.to_string(),
                description: description.to_string(),
                actor: actor.to_string(),
            })
            .await?;

        let statification = match self.record_crawl(actor, designation, description) {
            Ok(statification) => statification,
            Err(e) => {
                if let Err(stop_err) = self.crawler.stop() {
                    warn!(pid, error = %stop_err, "Failed to stop unrecorded crawl");
                }
                return Err(e);
            }
        };

        metrics::CRAWLS_STARTED.inc();
        info!(
            statification_id = statification.id,
            pid,
            %actor,
            "Statification crawl started"
        );
        Ok(statification)
    }

    fn record_crawl(
        &self,
        actor: &str,
        designation: &str,
        description: &str,
    ) -> Result<Statification, LifecycleError> {
        let statification = self.store.create(CreateStatificationRequest {
            designation: designation.to_string(),
            description: description.to_string(),
        })?;
        self.store
            .append_event(statification.id, actor, LifecycleAction::CreateStatification)?;
        Ok(statification)
    }

    /// Ask the running crawl to terminate.
    pub fn stop_crawl(&self, actor: &str) -> Result<(), LifecycleError> {
        self.do_stop_crawl(actor).map_err(|e| rejected("stop", e))
    }

    fn do_stop_crawl(&self, actor: &str) -> Result<(), LifecycleError> {
        validate_user(actor)?;

        if !self.crawler.stop()? {
            return Err(LifecycleError::InvalidInput(
                "no crawl is running".to_string(),
            ));
        }

        if let Some(current) = self.store.get_by_hash("")? {
            self.store
                .append_event(current.id, actor, LifecycleAction::CrawlStopped)?;
        }
        info!(%actor, "Crawl stop requested");
        Ok(())
    }

    /// Archive the in-progress statification in the background.
    pub fn save(&self, actor: &str) -> Result<(), LifecycleError> {
        self.do_save(actor).map_err(|e| rejected("archive", e))
    }

    fn do_save(&self, actor: &str) -> Result<(), LifecycleError> {
        validate_user(actor)?;

        if self.crawler.is_running() {
            return Err(LifecycleError::AlreadyRunning);
        }
        self.finalize_crawl()?;
        if self.store.get_by_hash("")?.is_none() {
            return Err(StoreError::NotFound("in-progress statification".to_string()).into());
        }

        self.admit(Job::Archive {
            actor: actor.to_string(),
        })
    }

    /// Push an archived statification to production in the background.
    pub fn deploy(&self, actor: &str, content_hash: &str) -> Result<(), LifecycleError> {
        self.do_deploy(actor, content_hash)
            .map_err(|e| rejected("deploy", e))
    }

    fn do_deploy(&self, actor: &str, content_hash: &str) -> Result<(), LifecycleError> {
        validate_user(actor)?;
        self.validate_archived(content_hash)?;

        self.admit(Job::Deploy {
            actor: actor.to_string(),
            content_hash: content_hash.to_string(),
        })
    }

    /// Extract an archived statification for preview in the background.
    pub fn visualize(&self, actor: &str, content_hash: &str) -> Result<(), LifecycleError> {
        self.do_visualize(actor, content_hash)
            .map_err(|e| rejected("visualize", e))
    }

    fn do_visualize(&self, actor: &str, content_hash: &str) -> Result<(), LifecycleError> {
        validate_user(actor)?;
        self.validate_archived(content_hash)?;

        self.admit(Job::Visualize {
            actor: actor.to_string(),
            content_hash: content_hash.to_string(),
        })
    }

    /// Take the lock, clear the artifact and queue `job`.
    ///
    /// On success the lock belongs to the job and is released by the worker.
    fn admit(&self, job: Job) -> Result<(), LifecycleError> {
        if !self.lock.try_acquire()? {
            return Err(LifecycleError::LockUnavailable);
        }
        let guard = LockGuard::new(self.lock.as_ref());

        self.status.clear()?;
        let operation = job.operation();
        self.jobs
            .submit(job)
            .map_err(|e| LifecycleError::Internal(e.to_string()))?;

        guard.disarm();
        info!(%operation, "Background job submitted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state for the polling front-end.
    ///
    /// Also observes the end of a crawl: a CREATED statification whose crawl
    /// is no longer running becomes STATIFIED.
    pub fn status(&self) -> Result<StatusView, LifecycleError> {
        self.finalize_crawl()?;

        let latest = self.store.latest(2)?;
        let item_count_to_crawl = latest.get(1).map(|s| s.item_count).unwrap_or(0);

        let (sha, designation, description, status) = match latest.first() {
            Some(current) if current.is_in_progress() => (
                String::new(),
                current.designation.clone(),
                current.description.clone(),
                current.status,
            ),
            Some(current) => (
                current.content_hash.clone(),
                String::new(),
                String::new(),
                current.status,
            ),
            None => (
                String::new(),
                String::new(),
                String::new(),
                StatificationStatus::Production,
            ),
        };

        Ok(StatusView {
            sha,
            designation,
            description,
            status,
            item_count_to_crawl,
            crawling: self.crawler.is_running(),
            locked: self.lock.is_locked()?,
            items_crawled: self.crawler.progress(),
            background: self.status.read()?,
        })
    }

    /// A page of the statification history.
    pub fn history(&self, filter: &StatificationFilter) -> Result<Vec<Statification>, LifecycleError> {
        Ok(self.store.list(filter)?)
    }

    pub fn count(&self) -> Result<i64, LifecycleError> {
        Ok(self.store.count()?)
    }

    /// A statification and its history. The empty hash names the in-progress one.
    pub fn info(&self, content_hash: &str) -> Result<StatificationInfo, LifecycleError> {
        if !content_hash.is_empty() {
            self.validate_archived(content_hash)?;
        }

        let statification = self
            .store
            .get_by_hash(content_hash)?
            .ok_or_else(|| StoreError::NotFound(content_hash.to_string()))?;
        let events = self.store.events_for(statification.id)?;

        Ok(StatificationInfo {
            statification,
            events,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn validate_archived(&self, content_hash: &str) -> Result<(), LifecycleError> {
        let known = self
            .archiver
            .known_hashes()
            .map_err(|e| LifecycleError::InvalidInput(e.to_string()))?;
        validate_content_hash(content_hash, &known)?;
        Ok(())
    }

    /// Move a finished crawl's statification from CREATED to STATIFIED.
    ///
    /// Runs under the exclusive lock so it cannot interleave with a crawl
    /// start. Skipped while the crawl runs or while another holder has the lock.
    fn finalize_crawl(&self) -> Result<(), LifecycleError> {
        if self.crawler.is_running() || !self.has_pending_crawl()? {
            return Ok(());
        }

        if !self.lock.try_acquire()? {
            return Ok(());
        }
        let _guard = LockGuard::new(self.lock.as_ref());

        // Re-check now that no crawl start can be in flight.
        if self.crawler.is_running() {
            return Ok(());
        }
        let Some(current) = self.store.get_by_hash("")? else {
            return Ok(());
        };
        if current.status != StatificationStatus::Created {
            return Ok(());
        }

        let items = self.crawler.progress();
        if self.store.complete_crawl(current.id, items)? {
            self.store
                .append_event(current.id, SYSTEM_ACTOR, LifecycleAction::CrawlCompleted)?;
            metrics::CRAWLS_COMPLETED.inc();
            info!(statification_id = current.id, items, "Crawl completed");
        }
        Ok(())
    }

    fn has_pending_crawl(&self) -> Result<bool, LifecycleError> {
        Ok(self
            .store
            .get_by_hash("")?
            .is_some_and(|current| current.status == StatificationStatus::Created))
    }
}
