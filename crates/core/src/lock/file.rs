//! File-backed lock that survives process restarts.
//!
//! The hold state lives in the file content: an empty file is free, a file
//! holding [`LOCK_SENTINEL`] is held. A short `flock(LOCK_EX | LOCK_NB)`
//! serializes the check-and-set between threads and processes; the sentinel
//! outlives the process, so a lock found after a crash stays held until an
//! operator truncates the file.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{LockError, LockManager};

/// Content written into the lock file while it is held.
pub const LOCK_SENTINEL: &str = "locked";

/// Lock persisted in a named file.
#[derive(Debug, Clone)]
pub struct FileLockManager {
    path: PathBuf,
}

impl FileLockManager {
    /// Create a lock manager for `path`, creating the file (and its parent
    /// directory) when missing. An existing file keeps its state.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, LockError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
    }
}

/// Try to take an exclusive advisory lock on `file` without blocking.
///
/// The advisory lock is dropped with the file descriptor.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid descriptor owned by `file` for the whole call.
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Ok(false);
    }
    Err(err)
}

fn has_sentinel(file: &mut File) -> io::Result<bool> {
    let mut content = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut content)?;
    Ok(!content.trim().is_empty())
}

impl LockManager for FileLockManager {
    fn try_acquire(&self) -> Result<bool, LockError> {
        let mut file = self.open()?;
        if !try_flock_exclusive(&file)? {
            debug!(path = %self.path.display(), "Lock file busy");
            return Ok(false);
        }
        if has_sentinel(&mut file)? {
            return Ok(false);
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(LOCK_SENTINEL.as_bytes())?;
        file.sync_all()?;
        debug!(path = %self.path.display(), "Lock acquired");
        Ok(true)
    }

    fn release(&self) -> Result<(), LockError> {
        let file = self.open()?;
        file.set_len(0)?;
        file.sync_all()?;
        debug!(path = %self.path.display(), "Lock released");
        Ok(())
    }

    fn is_locked(&self) -> Result<bool, LockError> {
        match File::open(&self.path) {
            Ok(mut file) => Ok(has_sentinel(&mut file)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
