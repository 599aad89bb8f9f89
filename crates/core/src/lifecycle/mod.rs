//! Statification lifecycle orchestration.
//!
//! State machine:
//!
//! ```text
//! CREATED    --(crawl completes)-->          STATIFIED
//! STATIFIED  --(archive)-->                  SAVED
//! SAVED      --(deploy)-->                   PRODUCTION
//! PRODUCTION --(deploy of another hash)-->   SAVED
//! SAVED / PRODUCTION --(visualize)-->        VISUALIZED
//! VISUALIZED --(visualize of another hash)--> SAVED
//! ```
//!
//! At most one statification is PRODUCTION and at most one is VISUALIZED:
//! promotion always demotes the previous holder first.

mod error;
mod executor;
mod jobs;
mod service;
mod types;
mod workspace;

pub use error::LifecycleError;
pub use executor::{create_job_system, JobHandle, JobWorker, SubmitError};
pub use jobs::{Job, JobRunner};
pub use service::{create_lifecycle, Collaborators, LifecycleService, SYSTEM_ACTOR};
pub use types::{StatificationInfo, StatusView};
