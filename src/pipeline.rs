//! The locate, parse, watch and notify loop.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::notifier::{Delivery, Notifier};
use crate::savefile::load_save_file;
use crate::watcher::{locate_save_files, SaveFileWatcher, WatchEvent, WatcherError};

/// Owns the notifier and feeds it freshly parsed save files.
#[derive(Debug)]
pub struct Pipeline {
    notifier: Notifier,
}

impl Pipeline {
    #[must_use]
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }

    /// Parse `path` and push the result, or its absence, to the display.
    pub async fn refresh(&self, path: &Path) -> Delivery {
        let db = load_save_file(path).await;
        self.notifier.notify(path, db).await
    }

    /// Refresh every path once, in order.
    pub async fn publish_all(&self, paths: &[PathBuf]) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(paths.len());
        for path in paths {
            deliveries.push(self.refresh(path).await);
        }
        deliveries
    }

    /// Refresh on every watch event until the channel closes.
    ///
    /// Events are handled one at a time in arrival order. Returns the number
    /// of refreshes performed.
    pub async fn drive(&self, mut events: mpsc::UnboundedReceiver<WatchEvent>) -> usize {
        let mut refreshes = 0;

        while let Some(event) = events.recv().await {
            match event {
                WatchEvent::Added(path) => {
                    tracing::info!(path = %path.display(), "Save file added");
                    self.refresh(&path).await;
                    refreshes += 1;
                }
                WatchEvent::Changed(path) => {
                    tracing::info!(path = %path.display(), "Save file changed");
                    self.refresh(&path).await;
                    refreshes += 1;
                }
                WatchEvent::Error(e) => {
                    tracing::warn!(error = %e, "Watcher error");
                }
            }
        }

        refreshes
    }

    /// Locate save files under `root`, publish them, then watch for changes.
    ///
    /// Returns immediately after the initial pass if nothing was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the file watcher cannot be started.
    pub async fn run(&self, root: &Path, file_name: &str) -> Result<(), WatcherError> {
        let scan = locate_save_files(root, file_name).await;
        tracing::info!(
            root = %root.display(),
            found = scan.paths.len(),
            skipped = scan.failures.len(),
            display_attached = self.notifier.is_attached(),
            "Scan complete"
        );
        for path in &scan.paths {
            tracing::info!(path = %path.display(), "Found save file");
        }

        self.publish_all(&scan.paths).await;

        if scan.paths.is_empty() {
            tracing::warn!(root = %root.display(), file_name, "No save files found");
            return Ok(());
        }

        let (watcher, events) = SaveFileWatcher::new(&scan.paths)?;
        tracing::info!(
            files = watcher.paths().len(),
            dirs = watcher.watched_dirs().len(),
            "Watching save files"
        );
        let refreshes = self.drive(events).await;
        drop(watcher);

        tracing::debug!(refreshes, "Watch loop ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::ChannelSink;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_refresh_delivers_parsed_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("!BugGrabber.lua");
        std::fs::write(&path, "BugGrabberDB = { session = 5 }").unwrap();

        let (sink, mut rx) = ChannelSink::channel();
        let pipeline = Pipeline::new(Notifier::new(sink));

        assert_eq!(pipeline.refresh(&path).await, Delivery::Delivered);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.path, path);
        assert_eq!(event.db.unwrap().session, Some(5));
    }

    #[tokio::test]
    async fn test_refresh_unparsable_delivers_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("!BugGrabber.lua");
        std::fs::write(&path, "BugGrabberDB = { session = }").unwrap();

        let (sink, mut rx) = ChannelSink::channel();
        let pipeline = Pipeline::new(Notifier::new(sink));

        assert_eq!(pipeline.refresh(&path).await, Delivery::Delivered);
        assert!(rx.try_recv().unwrap().db.is_none());
    }

    #[tokio::test]
    async fn test_drive_refreshes_once_per_event_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a!BugGrabber.lua");
        let second = temp_dir.path().join("b!BugGrabber.lua");
        std::fs::write(&first, "BugGrabberDB = { session = 1 }").unwrap();
        std::fs::write(&second, "BugGrabberDB = { session = 2 }").unwrap();

        let (sink, mut rx) = ChannelSink::channel();
        let pipeline = Pipeline::new(Notifier::new(sink));

        let (tx, events) = mpsc::unbounded_channel();
        tx.send(WatchEvent::Changed(second.clone())).unwrap();
        tx.send(WatchEvent::Error(WatcherError::NotFound(first.clone())))
            .unwrap();
        tx.send(WatchEvent::Added(first.clone())).unwrap();
        tx.send(WatchEvent::Changed(second.clone())).unwrap();
        drop(tx);

        assert_eq!(pipeline.drive(events).await, 3);

        let sessions: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|event| (event.path, event.db.and_then(|db| db.session)))
            .collect();
        assert_eq!(
            sessions,
            vec![(second.clone(), Some(2)), (first, Some(1)), (second, Some(2))]
        );
    }

    #[tokio::test]
    async fn test_run_without_save_files_returns() {
        let temp_dir = TempDir::new().unwrap();
        let (sink, mut rx) = ChannelSink::channel();
        let pipeline = Pipeline::new(Notifier::new(sink));

        pipeline
            .run(temp_dir.path(), crate::watcher::SAVE_FILE_NAME)
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }
}
