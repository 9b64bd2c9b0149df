use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = CleanupError> = std::result::Result<T, E>;

/// Everything that can go wrong while scanning or cleaning.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("path does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),

    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("cannot read metadata for {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("in use by another process: {}", .0.display())]
    InUse(PathBuf),

    #[error("no trash store is available on this platform")]
    TrashUnavailable,

    #[error("destination already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to move {} to trash: {reason}", path.display())]
    Trash { path: PathBuf, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fieldless mirror of [`CleanupError`] for reports and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RootNotFound,
    RootNotADirectory,
    NotFound,
    PermissionDenied,
    Unreadable,
    InUse,
    TrashUnavailable,
    AlreadyExists,
    Trash,
    Io,
}

// ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION
#[cfg(windows)]
fn is_in_use(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(windows))]
fn is_in_use(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ResourceBusy
}

impl CleanupError {
    /// Classify an I/O error raised while operating on `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        if is_in_use(&err) {
            return CleanupError::InUse(path);
        }

        match err.kind() {
            io::ErrorKind::NotFound => CleanupError::NotFound(path),
            io::ErrorKind::PermissionDenied => CleanupError::PermissionDenied(path),
            io::ErrorKind::ResourceBusy => CleanupError::InUse(path),
            io::ErrorKind::AlreadyExists => CleanupError::AlreadyExists(path),
            _ => CleanupError::Io { path, source: err },
        }
    }

    /// Like [`from_io`](Self::from_io), but anything unclassified becomes
    /// `Unreadable`. Used when stat-ing entries.
    pub fn from_metadata(path: &Path, err: io::Error) -> Self {
        match CleanupError::from_io(path, err) {
            CleanupError::Io { path, source } => CleanupError::Unreadable { path, source },
            other => other,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            CleanupError::RootNotFound(_) => FailureKind::RootNotFound,
            CleanupError::RootNotADirectory(_) => FailureKind::RootNotADirectory,
            CleanupError::NotFound(_) => FailureKind::NotFound,
            CleanupError::PermissionDenied(_) => FailureKind::PermissionDenied,
            CleanupError::Unreadable { .. } => FailureKind::Unreadable,
            CleanupError::InUse(_) => FailureKind::InUse,
            CleanupError::TrashUnavailable => FailureKind::TrashUnavailable,
            CleanupError::AlreadyExists(_) => FailureKind::AlreadyExists,
            CleanupError::Trash { .. } => FailureKind::Trash,
            CleanupError::Io { .. } => FailureKind::Io,
        }
    }

    /// A missing target is expected when a batch races an external change
    /// or repeats a path, so callers usually treat it as non-fatal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CleanupError::NotFound(_))
    }
}
