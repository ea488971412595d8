//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while scanning for or watching save files.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// The scan root does not exist or is not a directory.
    #[error("Scan root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A path disappeared or never existed.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied accessing a path.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatcherError {
    /// Classify an I/O error raised while accessing `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::Io(error),
        }
    }
}
