//! Save file watcher with notify integration.
//!
//! Watches an explicit set of files and emits an event for every creation or
//! content change the platform reports. Events are not debounced: a burst of
//! writes yields a burst of events, in delivery order.

use std::collections::HashSet;
use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::error::WatcherError;

/// Events emitted by the save file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// A watched file appeared (created or renamed into place).
    Added(PathBuf),
    /// A watched file's content changed.
    Changed(PathBuf),
    /// The notification backend reported an error.
    Error(WatcherError),
}

/// Watches a fixed set of save files.
///
/// Parent directories are watched non-recursively and events are filtered
/// down to the exact paths, so a file replaced by rename is still seen.
/// Dropping the watcher ends the subscription and closes the event channel.
pub struct SaveFileWatcher {
    paths: Vec<PathBuf>,
    watched_dirs: Vec<PathBuf>,
    _watcher: RecommendedWatcher,
}

impl SaveFileWatcher {
    /// Start watching `paths`.
    ///
    /// Returns the watcher and a receiver for watch events.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher cannot be created or a
    /// directory cannot be watched.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>), WatcherError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let targets: HashSet<PathBuf> = paths.iter().cloned().collect();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    for watch_event in classify(&event, &targets) {
                        let _ = event_tx.send(watch_event);
                    }
                }
                Err(e) => {
                    let _ = event_tx.send(WatchEvent::Error(WatcherError::Notify(e)));
                }
            }
        })?;

        let watched_dirs = watch_dirs(paths);
        for dir in &watched_dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            tracing::debug!(dir = %dir.display(), "Watching directory");
        }

        Ok((
            Self {
                paths: paths.to_vec(),
                watched_dirs,
                _watcher: watcher,
            },
            event_rx,
        ))
    }

    /// The files being watched.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The directories registered with the platform watcher.
    #[must_use]
    pub fn watched_dirs(&self) -> &[PathBuf] {
        &self.watched_dirs
    }
}

/// Distinct parent directories of `paths`, in first-seen order.
fn watch_dirs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .map(|path| match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => path.clone(),
        })
        .filter(|dir| seen.insert(dir.clone()))
        .collect()
}

/// Map a raw notify event to watch events for the paths in `targets`.
///
/// Metadata-only changes, removals and renames away are ignored.
#[must_use]
pub fn classify(event: &Event, targets: &HashSet<PathBuf>) -> Vec<WatchEvent> {
    let (paths, added): (&[PathBuf], bool) = match &event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            (event.paths.as_slice(), true)
        }
        // Both carries [from, to]; only the destination now holds content.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            (event.paths.get(1..).unwrap_or(&[]), true)
        }
        EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Modify(_) => (event.paths.as_slice(), false),
        _ => return Vec::new(),
    };

    paths
        .iter()
        .filter(|path| targets.contains(*path))
        .map(|path| {
            if added {
                WatchEvent::Added(path.clone())
            } else {
                WatchEvent::Changed(path.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use std::time::Duration;
    use tempfile::TempDir;

    fn targets(paths: &[&str]) -> HashSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_classify_create_is_added() {
        let events = classify(
            &event(EventKind::Create(CreateKind::File), &["/sv/!BugGrabber.lua"]),
            &targets(&["/sv/!BugGrabber.lua"]),
        );
        assert!(matches!(events.as_slice(), [WatchEvent::Added(p)] if p.ends_with("!BugGrabber.lua")));
    }

    #[test]
    fn test_classify_data_change_is_changed() {
        let events = classify(
            &event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/sv/!BugGrabber.lua"],
            ),
            &targets(&["/sv/!BugGrabber.lua"]),
        );
        assert!(matches!(events.as_slice(), [WatchEvent::Changed(_)]));
    }

    #[test]
    fn test_classify_ignores_unrelated_paths() {
        let events = classify(
            &event(
                EventKind::Modify(ModifyKind::Any),
                &["/sv/BugSack.lua"],
            ),
            &targets(&["/sv/!BugGrabber.lua"]),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_classify_ignores_metadata_and_remove() {
        let watched = targets(&["/sv/!BugGrabber.lua"]);
        let metadata = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &["/sv/!BugGrabber.lua"],
        );
        let remove = event(EventKind::Remove(RemoveKind::File), &["/sv/!BugGrabber.lua"]);
        assert!(classify(&metadata, &watched).is_empty());
        assert!(classify(&remove, &watched).is_empty());
    }

    #[test]
    fn test_classify_rename_into_place() {
        let watched = targets(&["/sv/!BugGrabber.lua"]);
        let both = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/sv/!BugGrabber.lua.tmp", "/sv/!BugGrabber.lua"],
        );
        assert!(matches!(classify(&both, &watched).as_slice(), [WatchEvent::Added(_)]));

        let away = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/sv/!BugGrabber.lua", "/sv/!BugGrabber.lua.old"],
        );
        assert!(classify(&away, &watched).is_empty());

        let from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/sv/!BugGrabber.lua"],
        );
        assert!(classify(&from, &watched).is_empty());
    }

    #[test]
    fn test_watch_dirs_deduplicates() {
        let dirs = watch_dirs(&[
            PathBuf::from("/a/SavedVariables/!BugGrabber.lua"),
            PathBuf::from("/b/SavedVariables/!BugGrabber.lua"),
            PathBuf::from("/a/SavedVariables/x!BugGrabber.lua"),
        ]);
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/a/SavedVariables"),
                PathBuf::from("/b/SavedVariables"),
            ]
        );
    }

    /// Start a watcher, or `None` when the platform refuses one (for example
    /// an exhausted inotify limit).
    fn try_watch(
        paths: &[PathBuf],
    ) -> Option<(SaveFileWatcher, mpsc::UnboundedReceiver<WatchEvent>)> {
        match SaveFileWatcher::new(paths) {
            Ok(started) => Some(started),
            Err(WatcherError::Notify(e)) => {
                eprintln!("Skipping test, watcher unavailable: {e}");
                None
            }
            Err(e) => panic!("Unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_watcher_detects_change() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().canonicalize().unwrap();
        let file_path = dir.join("!BugGrabber.lua");
        std::fs::write(&file_path, "BugGrabberDB = {}").unwrap();

        let Some((watcher, mut rx)) = try_watch(&[file_path.clone()]) else {
            return;
        };
        assert_eq!(watcher.paths(), &[file_path.clone()]);
        assert_eq!(watcher.watched_dirs(), &[dir]);

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(&file_path, "BugGrabberDB = { session = 2 }").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event for a write to a watched file")
            .expect("watcher channel closed");
        match event {
            WatchEvent::Changed(path) | WatchEvent::Added(path) => assert_eq!(path, file_path),
            WatchEvent::Error(e) => panic!("watcher error: {e}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_watcher_detects_replacement_by_rename() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().canonicalize().unwrap();
        let file_path = dir.join("!BugGrabber.lua");
        std::fs::write(&file_path, "BugGrabberDB = {}").unwrap();

        let Some((_watcher, mut rx)) = try_watch(&[file_path.clone()]) else {
            return;
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        let staged = dir.join("!BugGrabber.lua.tmp");
        std::fs::write(&staged, "BugGrabberDB = { session = 3 }").unwrap();
        std::fs::rename(&staged, &file_path).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event for a file renamed into place")
            .expect("watcher channel closed");
        assert!(matches!(event, WatchEvent::Added(ref path) if *path == file_path));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_watcher_ignores_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("!BugGrabber.lua");
        std::fs::write(&file_path, "").unwrap();

        let Some((watcher, mut rx)) = try_watch(&[file_path.clone()]) else {
            return;
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(temp_dir.path().join("BugSack.lua"), "BugSackDB = {}").unwrap();

        let event = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        drop(watcher);
        assert!(event.is_err(), "sibling file should not produce events");
    }
}
