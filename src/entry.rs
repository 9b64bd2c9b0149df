//! Per-entry metadata extraction.

use crate::error::{CleanupError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One filesystem object discovered during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub name: String,
    /// Bytes on disk for files and links, always 0 for directories.
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub modified: u64,
    /// Seconds since the Unix epoch.
    pub accessed: u64,
    pub is_directory: bool,
    pub extension: String,
}

impl FileEntry {
    /// Stat `path` without following symlinks and build its record.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata =
            fs::symlink_metadata(path).map_err(|e| CleanupError::from_metadata(path, e))?;
        Self::from_metadata(path, &metadata)
    }

    /// Build a record from metadata that was already fetched (e.g. by the walker).
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Result<Self> {
        let modified =
            epoch_secs(metadata.modified()).map_err(|e| CleanupError::from_metadata(path, e))?;
        let accessed =
            epoch_secs(metadata.accessed()).map_err(|e| CleanupError::from_metadata(path, e))?;

        // A lossy name would collide with its neighbours and could not be
        // handed back to the cleaner.
        let full = path.to_str().ok_or_else(|| CleanupError::Unreadable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "path is not valid UTF-8"),
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(full)
            .to_string();
        let extension = extension_of(&name);
        let is_directory = metadata.is_dir();

        Ok(FileEntry {
            path: full.to_string(),
            name,
            size: if is_directory { 0 } else { metadata.len() },
            modified,
            accessed,
            is_directory,
            extension,
        })
    }

    /// Whole days since last access, relative to `now` (epoch seconds).
    pub fn age_days(&self, now: u64) -> u64 {
        now.saturating_sub(self.accessed) / 86_400
    }
}

/// Lowercase suffix after the last dot of `name`, or "" when there is none.
/// A leading dot alone marks a hidden file, not an extension.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx + 1..].to_lowercase(),
    }
}

/// Timestamps before the epoch clamp to 0.
fn epoch_secs(time: io::Result<SystemTime>) -> io::Result<u64> {
    Ok(time?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0))
}
