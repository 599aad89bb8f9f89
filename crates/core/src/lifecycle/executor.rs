//! Background job executor.
//!
//! Jobs are queued on a channel and executed one at a time by a worker task.
//! Admission requires the lock, so the queue never holds more than the job in
//! flight. Whatever way a job ends, the worker writes exactly one status
//! artifact and then releases the lock.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::jobs::{Job, JobRunner};
use crate::lock::LockManager;
use crate::metrics;
use crate::status::{ErrorKind, StatusRecord, StatusStore};

/// Error returned when a job cannot be queued.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("job queue is full")]
    QueueFull,

    #[error("job executor has stopped")]
    Stopped,
}

/// Handle for submitting jobs. Clone it to share across tasks.
#[derive(Debug, Clone)]
pub struct JobHandle {
    tx: mpsc::Sender<Job>,
}

impl JobHandle {
    /// Queue `job` without waiting.
    pub fn submit(&self, job: Job) -> Result<(), SubmitError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::Stopped,
        })
    }
}

/// Worker consuming queued jobs.
pub struct JobWorker {
    rx: mpsc::Receiver<Job>,
    runner: Arc<JobRunner>,
    lock: Arc<dyn LockManager>,
    status: Arc<dyn StatusStore>,
}

impl JobWorker {
    /// Run until every handle is dropped.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Job worker started");

        while let Some(job) = self.rx.recv().await {
            self.execute(job).await;
        }

        info!("Job worker shutting down");
    }

    async fn execute(&self, job: Job) {
        let operation = job.operation();
        let started = Instant::now();
        info!(%operation, actor = %job.actor(), "Starting background job");

        // Run in its own task so a panic surfaces as a JoinError.
        let runner = Arc::clone(&self.runner);
        let task_job = job.clone();
        let outcome = tokio::spawn(async move { runner.run(&task_job).await }).await;

        let target = job.target_hash().map(str::to_string);
        let record = match outcome {
            Ok(Ok(content_hash)) => {
                info!(%operation, hash = %content_hash, "Background job succeeded");
                StatusRecord::succeeded(operation, content_hash)
            }
            Ok(Err(e)) => {
                error!(%operation, kind = %e.kind(), error = %e, "Background job failed");
                StatusRecord::failed(operation, e.kind(), target)
            }
            Err(e) => {
                error!(%operation, error = %e, "Background job aborted");
                StatusRecord::failed(operation, ErrorKind::Internal, target)
            }
        };

        let outcome_label = record.error.map(|k| k.as_str()).unwrap_or("success");
        metrics::JOBS_TOTAL
            .with_label_values(&[operation.as_str(), outcome_label])
            .inc();
        metrics::JOB_DURATION
            .with_label_values(&[operation.as_str()])
            .observe(started.elapsed().as_secs_f64());

        if let Err(e) = self.status.write(&record) {
            error!(%operation, error = %e, "Failed to write status artifact");
        }
        if let Err(e) = self.lock.release() {
            error!(%operation, error = %e, "Failed to release lock");
        }
    }
}

/// Create a job executor.
///
/// Returns:
/// - `JobHandle` - for submitting jobs
/// - `JobWorker` - spawn this as a background task with `tokio::spawn(worker.run())`
pub fn create_job_system(
    runner: JobRunner,
    lock: Arc<dyn LockManager>,
    status: Arc<dyn StatusStore>,
    queue_capacity: usize,
) -> (JobHandle, JobWorker) {
    let (tx, rx) = mpsc::channel(queue_capacity.max(1));
    let handle = JobHandle { tx };
    let worker = JobWorker {
        rx,
        runner: Arc::new(runner),
        lock,
        status,
    };
    (handle, worker)
}
