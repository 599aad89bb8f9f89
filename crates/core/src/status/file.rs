//! Status artifact persisted as a small JSON file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{StatusError, StatusRecord, StatusStore};

/// Content of a cleared artifact.
const EMPTY: &[u8] = b"{}";

/// Status artifact stored at a fixed path, replaced via temp file + rename.
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    path: PathBuf,
}

impl FileStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn atomic_write(&self, content: &[u8]) -> Result<(), StatusError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl StatusStore for FileStatusStore {
    fn clear(&self) -> Result<(), StatusError> {
        self.atomic_write(EMPTY)
    }

    fn write(&self, record: &StatusRecord) -> Result<(), StatusError> {
        let content =
            serde_json::to_vec(record).map_err(|e| StatusError::Corrupt(e.to_string()))?;
        self.atomic_write(&content)
    }

    fn read(&self) -> Result<Option<StatusRecord>, StatusError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = match serde_json::from_slice(&content) {
            Ok(value) => value,
            Err(_) if content.iter().all(u8::is_ascii_whitespace) => return Ok(None),
            Err(e) => return Err(StatusError::Corrupt(e.to_string())),
        };

        if value.as_object().map(|o| o.is_empty()).unwrap_or(false) {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StatusError::Corrupt(e.to_string()))
    }
}
