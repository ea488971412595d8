//! Save file discovery.
//!
//! Walks a directory tree looking for files whose name matches a predicate.
//! A failure on one entry is logged and skipped; it never stops the scan.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use super::error::WatcherError;

/// File name the addon saves its database under.
pub const SAVE_FILE_NAME: &str = "!BugGrabber.lua";

/// A path the scan could not descend into or inspect.
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: WatcherError,
}

/// Outcome of a completed scan.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Matching files, in the order they were found.
    pub paths: Vec<PathBuf>,
    /// Entries that were skipped because of an error.
    pub failures: Vec<ScanFailure>,
}

impl ScanResult {
    fn record_failure(&mut self, path: PathBuf, error: io::Error) {
        tracing::warn!(path = %path.display(), error = %error, "Skipping unreadable path");
        let error = WatcherError::from_io(path.clone(), error);
        self.failures.push(ScanFailure { path, error });
    }
}

/// Whether the file name of `path` ends with `suffix`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use buggrabber_viewer::watcher::has_name_suffix;
///
/// assert!(has_name_suffix(Path::new("/wtf/SavedVariables/!BugGrabber.lua"), "!BugGrabber.lua"));
/// assert!(!has_name_suffix(Path::new("/wtf/!BugGrabber.lua.bak"), "!BugGrabber.lua"));
/// ```
#[must_use]
pub fn has_name_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(suffix))
}

/// Kind of a directory entry, as far as the walk cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    Other,
}

/// The contents of one directory.
#[derive(Debug, Default)]
struct Listing {
    entries: Vec<(PathBuf, io::Result<EntryKind>)>,
    /// Set when reading the directory failed partway through.
    interrupted: Option<io::Error>,
}

/// List `dir` from the filesystem. Symlinks are reported as [`EntryKind::Other`].
async fn read_listing(dir: PathBuf) -> io::Result<Listing> {
    let mut entries = tokio::fs::read_dir(&dir).await?;
    let mut listing = Listing::default();

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let kind = entry.file_type().await.map(|file_type| {
                    if file_type.is_dir() {
                        EntryKind::Dir
                    } else {
                        EntryKind::Other
                    }
                });
                listing.entries.push((entry.path(), kind));
            }
            Ok(None) => break,
            Err(e) => {
                listing.interrupted = Some(e);
                break;
            }
        }
    }

    Ok(listing)
}

/// Scan `root` recursively for files accepted by `matches`.
///
/// Paths are absolute. Entries within a directory are visited in name order
/// and the tree is walked depth-first, so results are deterministic for an
/// unchanged tree. Symlinked directories are not followed. The scan always
/// completes; unreadable entries end up in [`ScanResult::failures`].
pub async fn locate<F>(root: &Path, matches: F) -> ScanResult
where
    F: Fn(&Path) -> bool,
{
    walk(root, matches, read_listing).await
}

async fn walk<F, L, Fut>(root: &Path, matches: F, list: L) -> ScanResult
where
    F: Fn(&Path) -> bool,
    L: Fn(PathBuf) -> Fut,
    Fut: Future<Output = io::Result<Listing>>,
{
    let mut result = ScanResult::default();

    let root = match std::path::absolute(root) {
        Ok(root) => root,
        Err(e) => {
            result.record_failure(root.to_path_buf(), e);
            return result;
        }
    };

    match tokio::fs::metadata(&root).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            tracing::warn!(path = %root.display(), "Scan root is not a directory");
            result.failures.push(ScanFailure {
                error: WatcherError::NotADirectory(root.clone()),
                path: root,
            });
            return result;
        }
        Err(e) => {
            result.record_failure(root, e);
            return result;
        }
    }

    let mut pending = vec![root];

    while let Some(dir) = pending.pop() {
        let mut listing = match list(dir.clone()).await {
            Ok(listing) => listing,
            Err(e) => {
                result.record_failure(dir, e);
                continue;
            }
        };
        if let Some(e) = listing.interrupted.take() {
            result.record_failure(dir.clone(), e);
        }
        listing
            .entries
            .sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()));

        let mut subdirs = Vec::new();
        for (path, kind) in listing.entries {
            match kind {
                Ok(EntryKind::Dir) => subdirs.push(path),
                Ok(EntryKind::Other) => {
                    if matches(&path) {
                        tracing::debug!(path = %path.display(), "Found save file");
                        result.paths.push(path);
                    }
                }
                Err(e) => result.record_failure(path, e),
            }
        }

        // Reversed so the stack pops subdirectories in name order.
        pending.extend(subdirs.into_iter().rev());
    }

    result
}

/// Scan `root` for files named like the addon's save file.
pub async fn locate_save_files(root: &Path, file_name: &str) -> ScanResult {
    locate(root, |path| has_name_suffix(path, file_name)).await
}
