//! Archiver shelling out to `tar`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use sha1::{Digest, Sha1};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ArchiveError, Archiver};
use crate::validation::{known_archive_hashes, ARCHIVE_EXTENSION};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Archives directories with `tar -czf` into `<archive_repository>/<sha1>.tar.gz`.
#[derive(Debug, Clone)]
pub struct TarArchiver {
    tar_path: PathBuf,
    archive_repository: PathBuf,
}

impl TarArchiver {
    pub fn new(tar_path: impl Into<PathBuf>, archive_repository: impl Into<PathBuf>) -> Self {
        Self {
            tar_path: tar_path.into(),
            archive_repository: archive_repository.into(),
        }
    }

    /// Path of the archive for `content_hash`.
    pub fn archive_path(&self, content_hash: &str) -> PathBuf {
        self.archive_repository
            .join(format!("{}{}", content_hash, ARCHIVE_EXTENSION))
    }

    async fn run_tar(&self, args: Vec<std::ffi::OsString>) -> Result<(), ArchiveError> {
        debug!(tar = %self.tar_path.display(), ?args, "Running tar");

        let output = Command::new(&self.tar_path)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ArchiveError::TarNotFound {
                        path: self.tar_path.clone(),
                    }
                } else {
                    ArchiveError::Io(e)
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        for line in stderr.lines() {
            warn!(line, "tar");
        }

        if !output.status.success() {
            return Err(ArchiveError::command_failed(
                format!("tar exited with code: {:?}", output.status.code()),
                stderr,
            ));
        }

        Ok(())
    }
}

/// Hex encoded SHA-1 of a file.
async fn sha1_file(path: &Path) -> Result<String, ArchiveError> {
    let file = File::open(path).await?;
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut hasher = Sha1::new();

    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[async_trait]
impl Archiver for TarArchiver {
    async fn create(&self, source: &Path) -> Result<String, ArchiveError> {
        if !source.is_dir() {
            return Err(ArchiveError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        // Archive the directory itself so extraction strips one component.
        let parent = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = source.file_name().ok_or_else(|| ArchiveError::SourceNotFound {
            path: source.to_path_buf(),
        })?;

        tokio::fs::create_dir_all(&self.archive_repository).await?;
        let partial = self
            .archive_repository
            .join(format!(".partial-{}.tmp", uuid::Uuid::new_v4()));

        info!(source = %source.display(), "Creating archive");
        let result = self
            .run_tar(vec![
                "-czf".into(),
                partial.clone().into_os_string(),
                "-C".into(),
                parent.as_os_str().to_owned(),
                name.to_owned(),
            ])
            .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }

        if !tokio::fs::try_exists(&partial).await.unwrap_or(false) {
            return Err(ArchiveError::command_failed(
                "tar produced no archive",
                String::new(),
            ));
        }

        let content_hash = match sha1_file(&partial).await {
            Ok(hash) => hash,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        let target = self.archive_path(&content_hash);
        tokio::fs::rename(&partial, &target).await?;
        info!(hash = %content_hash, archive = %target.display(), "Archive created");

        Ok(content_hash)
    }

    async fn extract(&self, content_hash: &str, dest: &Path) -> Result<(), ArchiveError> {
        let archive = self.archive_path(content_hash);
        if !archive.is_file() {
            return Err(ArchiveError::ArchiveNotFound { path: archive });
        }

        tokio::fs::create_dir_all(dest).await?;

        info!(hash = %content_hash, dest = %dest.display(), "Extracting archive");
        self.run_tar(vec![
            "-xzf".into(),
            archive.into_os_string(),
            "-C".into(),
            dest.as_os_str().to_owned(),
            "--strip-components=1".into(),
        ])
        .await
    }

    fn known_hashes(&self) -> Result<Vec<String>, ArchiveError> {
        known_archive_hashes(&self.archive_repository).map_err(|e| {
            ArchiveError::RepositoryUnavailable {
                reason: e.to_string(),
            }
        })
    }
}
