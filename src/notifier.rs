//! Delivery of parsed records to the display.
//!
//! The display is reached through a [`DisplaySink`] owned by the
//! [`Notifier`]. Delivery is fire-and-forget: nothing is acknowledged,
//! retried or queued, and a missing display simply means the change is
//! dropped.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ipc::{ChangeEvent, IpcError};
use crate::savefile::ParsedRecord;

/// Something that can show change events.
#[async_trait]
pub trait DisplaySink: Send + Sync {
    /// Whether a display is currently there to receive events.
    fn is_attached(&self) -> bool;

    /// Hand one event to the display.
    async fn deliver(&self, event: &ChangeEvent) -> Result<(), IpcError>;
}

/// In-process sink backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver the display reads from.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DisplaySink for ChannelSink {
    fn is_attached(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn deliver(&self, event: &ChangeEvent) -> Result<(), IpcError> {
        self.tx
            .send(event.clone())
            .map_err(|_| IpcError::DisplayDetached)
    }
}

/// Outcome of one notification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The display accepted the event.
    Delivered,
    /// No display was attached; the event was discarded.
    Dropped,
    /// A display was attached but delivery failed.
    Failed,
}

/// Forwards parsed records to the display, if one is attached.
///
/// The default notifier has no sink and drops every notification.
#[derive(Default)]
pub struct Notifier {
    sink: Option<Box<dyn DisplaySink>>,
}

impl Notifier {
    /// Create a notifier delivering to `sink`.
    #[must_use]
    pub fn new(sink: impl DisplaySink + 'static) -> Self {
        Self {
            sink: Some(Box::new(sink)),
        }
    }

    /// Whether a display is attached and reachable right now.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| sink.is_attached())
    }

    /// Send the result of parsing `path` to the display.
    pub async fn notify(&self, path: &Path, db: Option<ParsedRecord>) -> Delivery {
        let Some(sink) = self.sink.as_ref().filter(|sink| sink.is_attached()) else {
            tracing::debug!(path = %path.display(), "No display attached, dropping change");
            return Delivery::Dropped;
        };

        let event = ChangeEvent {
            path: path.to_path_buf(),
            db,
        };

        match sink.deliver(&event).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), has_record = event.db.is_some(), "Change delivered");
                Delivery::Delivered
            }
            Err(IpcError::DisplayNotRunning | IpcError::DisplayDetached) => {
                tracing::debug!(path = %path.display(), "Display went away, dropping change");
                Delivery::Dropped
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to deliver change");
                Delivery::Failed
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FailingSink {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DisplaySink for FailingSink {
        fn is_attached(&self) -> bool {
            true
        }

        async fn deliver(&self, _event: &ChangeEvent) -> Result<(), IpcError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(IpcError::ConnectionFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            )))
        }
    }

    #[tokio::test]
    async fn test_detached_notifier_drops() {
        let notifier = Notifier::default();
        assert!(!notifier.is_attached());
        let delivery = notifier.notify(Path::new("/a"), None).await;
        assert_eq!(delivery, Delivery::Dropped);
    }

    #[tokio::test]
    async fn test_channel_delivery() {
        let (sink, mut rx) = ChannelSink::channel();
        let notifier = Notifier::new(sink);
        assert!(notifier.is_attached());

        let record = ParsedRecord {
            session: Some(9),
            ..Default::default()
        };
        let delivery = notifier.notify(Path::new("/a"), Some(record.clone())).await;
        assert_eq!(delivery, Delivery::Delivered);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.path, PathBuf::from("/a"));
        assert_eq!(event.db, Some(record));
    }

    #[tokio::test]
    async fn test_closed_channel_drops() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        let notifier = Notifier::new(sink);
        assert!(!notifier.is_attached());
        assert_eq!(notifier.notify(Path::new("/a"), None).await, Delivery::Dropped);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let notifier = Notifier::new(FailingSink {
            attempts: Arc::clone(&attempts),
        });
        assert_eq!(notifier.notify(Path::new("/a"), None).await, Delivery::Failed);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
