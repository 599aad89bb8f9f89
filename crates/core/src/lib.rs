//! Lifecycle orchestration for statifications: crawled, archived, deployed
//! and previewed snapshots of a website.

pub mod archive;
pub mod config;
pub mod crawler;
pub mod deploy;
pub mod lifecycle;
pub mod lock;
pub mod metrics;
pub mod statification;
pub mod status;
pub mod testing;
pub mod validation;

pub use archive::{ArchiveError, Archiver, TarArchiver};
pub use config::{
    load_config, load_config_from_str, validate_config, verify_paths, Config, ConfigError,
    SanitizedConfig,
};
pub use crawler::{CrawlError, CrawlRequest, Crawler, ProcessCrawler};
pub use deploy::{DeployError, Deployer, ScriptDeployer};
pub use lifecycle::{
    create_lifecycle, Collaborators, LifecycleError, LifecycleService, StatificationInfo,
    StatusView,
};
pub use lock::{FileLockManager, InMemoryLockManager, LockError, LockManager};
pub use statification::{
    HistoryOrder, LifecycleAction, LifecycleEvent, SqliteConnector, SqliteStatificationStore,
    Statification, StatificationFilter, StatificationStatus, StatificationStore, StoreConnector,
    StoreError,
};
pub use status::{
    ErrorKind, FileStatusStore, InMemoryStatusStore, Operation, StatusError, StatusRecord,
    StatusStore,
};
pub use validation::ValidationError;
