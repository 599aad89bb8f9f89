//! Validation of externally supplied identifiers.
//!
//! Content hashes are checked against a fixed policy (length and alphabet)
//! and against the set of archives actually present on disk. Usernames come
//! from the fronting proxy and are checked against a small character set.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

/// Length of a content hash (hex encoded SHA-1 of the archive).
pub const CONTENT_HASH_LEN: usize = 40;

/// Suffix of archive files in the archive repository.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Maximum accepted username length.
pub const MAX_USERNAME_LEN: usize = 64;

static HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

/// Errors produced while validating identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content hash is empty")]
    EmptyHash,

    #[error("content hash does not respect the hash policy: {0}")]
    MalformedHash(String),

    #[error("no archive exists for content hash: {0}")]
    UnknownHash(String),

    #[error("archive repository does not exist: {}", .0.display())]
    MissingArchiveRepository(PathBuf),

    #[error("failed to list archive repository: {0}")]
    ArchiveRepository(String),

    #[error("user identity is empty")]
    EmptyUser,

    #[error("user identity does not respect the username policy: {0}")]
    InvalidUser(String),

    #[error("designation is empty")]
    EmptyDesignation,
}

/// Whether `hash` has the shape of a content hash, regardless of existence.
pub fn is_well_formed_hash(hash: &str) -> bool {
    hash.len() == CONTENT_HASH_LEN && HASH_RE.is_match(hash)
}

/// Validate a content hash against the policy and a set of known hashes.
pub fn validate_content_hash<S: AsRef<str>>(
    hash: &str,
    known: &[S],
) -> Result<(), ValidationError> {
    if hash.is_empty() {
        return Err(ValidationError::EmptyHash);
    }
    if !is_well_formed_hash(hash) {
        return Err(ValidationError::MalformedHash(hash.to_string()));
    }
    if !known.iter().any(|k| k.as_ref() == hash) {
        return Err(ValidationError::UnknownHash(hash.to_string()));
    }
    Ok(())
}

/// List the hashes of all archives stored in `archive_repository`.
pub fn known_archive_hashes(archive_repository: &Path) -> Result<Vec<String>, ValidationError> {
    if !archive_repository.is_dir() {
        return Err(ValidationError::MissingArchiveRepository(
            archive_repository.to_path_buf(),
        ));
    }

    let entries = std::fs::read_dir(archive_repository)
        .map_err(|e| ValidationError::ArchiveRepository(e.to_string()))?;

    let mut hashes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ValidationError::ArchiveRepository(e.to_string()))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(hash) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_suffix(ARCHIVE_EXTENSION))
        {
            hashes.push(hash.to_string());
        }
    }

    Ok(hashes)
}

/// Validate that `hash` is well formed and names an archive in `archive_repository`.
pub fn validate_archived_hash(hash: &str, archive_repository: &Path) -> Result<(), ValidationError> {
    let known = known_archive_hashes(archive_repository)?;
    validate_content_hash(hash, &known)
}

/// Validate the identity of the user requesting an operation.
pub fn validate_user(user: &str) -> Result<(), ValidationError> {
    if user.is_empty() {
        return Err(ValidationError::EmptyUser);
    }
    if user.len() > MAX_USERNAME_LEN || !USERNAME_RE.is_match(user) {
        return Err(ValidationError::InvalidUser(user.to_string()));
    }
    Ok(())
}

/// Validate the designation given to a new statification.
pub fn validate_designation(designation: &str) -> Result<(), ValidationError> {
    if designation.trim().is_empty() {
        return Err(ValidationError::EmptyDesignation);
    }
    Ok(())
}
