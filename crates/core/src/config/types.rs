use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub deploy: DeployConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/opt/statif/statif.db")
}

/// Filesystem layout shared by the crawler, the jobs and the front-end.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Working directory the crawler fills with the new statification.
    #[serde(default = "default_static_repository")]
    pub static_repository: PathBuf,
    /// Directory an archived statification is extracted into for preview.
    #[serde(default = "default_visualize_repository")]
    pub visualize_repository: PathBuf,
    /// Directory holding `<hash>.tar.gz` archives.
    #[serde(default = "default_archive_repository")]
    pub archive_repository: PathBuf,
    /// Directory for crawl logs (`<hash>.log` once archived).
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file of the crawl in progress.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Lock file serializing lifecycle operations.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
    /// Status artifact of the latest background operation.
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    /// Pid of the running crawl process.
    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
    /// Number of pages crawled so far, written by the crawler.
    #[serde(default = "default_progress_counter_file")]
    pub progress_counter_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            static_repository: default_static_repository(),
            visualize_repository: default_visualize_repository(),
            archive_repository: default_archive_repository(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            lock_file: default_lock_file(),
            status_file: default_status_file(),
            pid_file: default_pid_file(),
            progress_counter_file: default_progress_counter_file(),
        }
    }
}

impl PathsConfig {
    /// Layout rooted under a single directory, mirroring the default install.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            static_repository: root.join("static"),
            visualize_repository: root.join("visualize"),
            archive_repository: root.join("archive"),
            log_dir: root.join("log"),
            log_file: root.join("log").join("statif.log"),
            lock_file: root.join(".lock_access"),
            status_file: root.join("statusBackground.json"),
            pid_file: root.join(".pid.data"),
            progress_counter_file: root.join(".crawlerProgressCounterFile.txt"),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("/opt/statif")
}

fn default_static_repository() -> PathBuf {
    default_root().join("static")
}

fn default_visualize_repository() -> PathBuf {
    default_root().join("visualize")
}

fn default_archive_repository() -> PathBuf {
    default_root().join("archive")
}

fn default_log_dir() -> PathBuf {
    default_root().join("log")
}

fn default_log_file() -> PathBuf {
    default_log_dir().join("statif.log")
}

fn default_lock_file() -> PathBuf {
    default_root().join(".lock_access")
}

fn default_status_file() -> PathBuf {
    default_root().join("statusBackground.json")
}

fn default_pid_file() -> PathBuf {
    default_root().join(".pid.data")
}

fn default_progress_counter_file() -> PathBuf {
    default_root().join(".crawlerProgressCounterFile.txt")
}

/// External crawl process configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Program to launch (e.g. a scrapy wrapper script)
    pub program: PathBuf,
    /// Extra arguments passed before the statification metadata
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory of the crawl process (defaults to the current one)
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra environment for the crawl process
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Production deployment configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployConfig {
    /// Script receiving the archive hash as its only argument
    pub script: PathBuf,
    /// Interpreter used to run the script
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
}

fn default_shell() -> PathBuf {
    PathBuf::from("bash")
}

/// Archive tooling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_tar_path")]
    pub tar_path: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            tar_path: default_tar_path(),
        }
    }
}

fn default_tar_path() -> PathBuf {
    PathBuf::from("tar")
}

/// Background job executor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
    /// Capacity of the job queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    16
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

/// Sanitized config for API responses (environment of the crawler hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub crawler: SanitizedCrawlerConfig,
    pub deploy: DeployConfig,
    pub archive: ArchiveConfig,
    pub executor: ExecutorConfig,
}

/// Crawler config with environment values redacted
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCrawlerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env_keys: Vec<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            paths: config.paths.clone(),
            crawler: SanitizedCrawlerConfig {
                program: config.crawler.program.clone(),
                args: config.crawler.args.clone(),
                working_dir: config.crawler.working_dir.clone(),
                env_keys: config.crawler.env.keys().cloned().collect(),
            },
            deploy: config.deploy.clone(),
            archive: config.archive.clone(),
            executor: config.executor.clone(),
        }
    }
}
