//! Filesystem preparation shared by crawl start and the jobs.

use std::io;
use std::path::Path;

use tracing::debug;

use super::LifecycleError;

/// Empty `dir`, creating it when missing. The directory itself is kept.
pub async fn clean_directory(dir: &Path) -> Result<(), LifecycleError> {
    debug!(dir = %dir.display(), "Cleaning directory");

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LifecycleError::prepare(dir, e))?;

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| LifecycleError::prepare(dir, e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LifecycleError::prepare(dir, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| LifecycleError::prepare(&path, e))?;
        let removed = if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        removed.map_err(|e| LifecycleError::prepare(&path, e))?;
    }

    Ok(())
}

/// Create `dir` if needed; an existing directory is fine.
pub async fn ensure_directory(dir: &Path) -> Result<(), LifecycleError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LifecycleError::prepare(dir, e))
}

/// Remove `file`; a missing file is fine.
pub async fn remove_if_exists(file: &Path) -> Result<(), LifecycleError> {
    match tokio::fs::remove_file(file).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(file = %file.display(), "Nothing to remove");
            Ok(())
        }
        Err(e) => Err(LifecycleError::prepare(file, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_clean_directory_keeps_root() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("static");
        std::fs::create_dir_all(dir.join("a/b")).unwrap();
        std::fs::write(dir.join("index.html"), "x").unwrap();
        std::fs::write(dir.join("a/b/page.html"), "y").unwrap();

        clean_directory(&dir).await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clean_directory_creates_missing() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("visualize");
        clean_directory(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let tmp = TempDir::new().unwrap();
        remove_if_exists(&tmp.path().join("statif.log"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_directory_over_file_fails() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("log");
        std::fs::write(&file, "not a dir").unwrap();
        assert!(matches!(
            ensure_directory(&file).await,
            Err(LifecycleError::Prepare { .. })
        ));
    }
}
