//! Crawl controller backed by a detached OS process.
//!
//! The process id is recorded in a pid file so liveness survives restarts of
//! the server. The crawler reports progress by rewriting a counter file with
//! the number of pages captured so far.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{CrawlError, CrawlRequest, Crawler};
use crate::config::{CrawlerConfig, PathsConfig};

/// Crawl controller spawning the configured crawl program.
#[derive(Debug, Clone)]
pub struct ProcessCrawler {
    config: CrawlerConfig,
    output_dir: PathBuf,
    log_file: PathBuf,
    pid_file: PathBuf,
    progress_counter_file: PathBuf,
}

impl ProcessCrawler {
    pub fn new(config: CrawlerConfig, paths: &PathsConfig) -> Self {
        Self {
            config,
            output_dir: paths.static_repository.clone(),
            log_file: paths.log_file.clone(),
            pid_file: paths.pid_file.clone(),
            progress_counter_file: paths.progress_counter_file.clone(),
        }
    }

    fn recorded_pid(&self) -> Option<u32> {
        let content = std::fs::read_to_string(&self.pid_file).ok()?;
        content.trim().parse::<u32>().ok().filter(|pid| *pid != 0)
    }

    /// Pid of the crawl process if it is alive and still our crawler.
    fn running_pid(&self) -> Option<u32> {
        let pid = self.recorded_pid()?;
        if !is_pid_alive(pid) || is_zombie(pid) {
            return None;
        }
        if !matches_program(pid, &self.config.program) {
            debug!(pid, "Recorded pid belongs to another program");
            return None;
        }
        Some(pid)
    }
}

/// Whether `pid` exists, using `kill(pid, 0)`.
fn is_pid_alive(pid: u32) -> bool {
    let Ok(pid_i32) = i32::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 only checks for existence.
    let result = unsafe { libc::kill(pid_i32, 0) };
    if result == 0 {
        return true;
    }
    // EPERM: the process exists but belongs to someone else.
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Whether `pid` has exited and waits to be reaped. Unknown on non-Linux hosts.
fn is_zombie(pid: u32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    stat.rsplit_once(')')
        .map(|(_, rest)| rest.trim_start().starts_with('Z'))
        .unwrap_or(false)
}

/// Whether the command line of `pid` mentions `program`.
///
/// Guards against pid reuse after a restart. Assumed true when `/proc` is
/// not available.
fn matches_program(pid: u32, program: &Path) -> bool {
    let Ok(cmdline) = std::fs::read(format!("/proc/{}/cmdline", pid)) else {
        return true;
    };
    let Some(wanted) = program.file_name() else {
        return true;
    };

    cmdline
        .split(|b| *b == 0)
        .filter(|arg| !arg.is_empty())
        .any(|arg| {
            let arg = String::from_utf8_lossy(arg);
            Path::new(&*arg).file_name() == Some(wanted)
        })
}

/// Read the progress counter, treating absence or garbage as zero.
fn read_counter(path: &Path) -> i64 {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

#[async_trait]
impl Crawler for ProcessCrawler {
    async fn start(&self, request: &CrawlRequest) -> Result<u32, CrawlError> {
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(|source| CrawlError::LogFile {
                path: self.log_file.clone(),
                source,
            })?;
        let log_err = log.try_clone().map_err(|source| CrawlError::LogFile {
            path: self.log_file.clone(),
            source,
        })?;

        tokio::fs::write(&self.progress_counter_file, "0").await?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .env("STATIF_CRAWL_DESIGNATION", &request.designation)
            .env("STATIF_CRAWL_DESCRIPTION", &request.description)
            .env("STATIF_CRAWL_ACTOR", &request.actor)
            .env("STATIF_CRAWL_OUTPUT_DIR", &self.output_dir)
            .env("STATIF_CRAWL_PROGRESS_FILE", &self.progress_counter_file)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(false);

        if let Some(ref dir) = self.config.working_dir {
            command.current_dir(dir);
        }

        // Own process group: signals aimed at the server leave the crawl alone.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CrawlError::ProgramNotFound {
                    path: self.config.program.clone(),
                }
            } else {
                CrawlError::Io(e)
            }
        })?;

        let pid = child.id().unwrap_or(0);
        tokio::fs::write(&self.pid_file, pid.to_string()).await?;
        info!(
            pid,
            designation = %request.designation,
            actor = %request.actor,
            "Crawl process started"
        );

        // Reap the child so it never lingers as a zombie.
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => info!(pid, ?status, "Crawl process exited"),
                Err(e) => warn!(pid, error = %e, "Failed to wait for crawl process"),
            }
        });

        Ok(pid)
    }

    fn is_running(&self) -> bool {
        self.running_pid().is_some()
    }

    fn stop(&self) -> Result<bool, CrawlError> {
        let Some(pid) = self.running_pid() else {
            return Ok(false);
        };

        let pid_i32 = i32::try_from(pid).map_err(|_| CrawlError::Signal {
            pid,
            source: io::Error::from(io::ErrorKind::InvalidInput),
        })?;
        // SAFETY: plain kill(2) on a pid we recorded and checked above.
        let result = unsafe { libc::kill(pid_i32, libc::SIGTERM) };
        if result != 0 {
            return Err(CrawlError::Signal {
                pid,
                source: io::Error::last_os_error(),
            });
        }

        info!(pid, "Sent SIGTERM to crawl process");
        Ok(true)
    }

    fn progress(&self) -> i64 {
        read_counter(&self.progress_counter_file)
    }
}
