//! IPC client for the pipeline process.
//!
//! Pushes change events to a display process listening on a Unix socket.
//! One connection is opened per event and nothing is read back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

use crate::ipc::{ChangeEvent, DisplayMessage, IpcError};
use crate::notifier::DisplaySink;

/// Socket-backed [`DisplaySink`].
#[derive(Debug, Clone)]
pub struct DisplayClient {
    socket_path: PathBuf,
}

impl DisplayClient {
    /// Creates a new client with a custom socket path.
    #[must_use]
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            socket_path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Checks if the display is running by verifying the socket file exists.
    #[must_use]
    pub fn is_display_running(&self) -> bool {
        self.socket_path.exists()
    }
}

#[async_trait]
impl DisplaySink for DisplayClient {
    fn is_attached(&self) -> bool {
        self.is_display_running()
    }

    /// Writes the event as a single JSON line.
    ///
    /// A socket file left behind by a display that exited is reported as
    /// [`IpcError::DisplayNotRunning`], the same as a missing one.
    async fn deliver(&self, event: &ChangeEvent) -> Result<(), IpcError> {
        if !self.is_display_running() {
            return Err(IpcError::DisplayNotRunning);
        }

        let mut stream = match UnixStream::connect(&self.socket_path).await {
            Ok(stream) => stream,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused
                ) =>
            {
                return Err(IpcError::DisplayNotRunning);
            }
            Err(e) => return Err(e.into()),
        };

        let mut line = serde_json::to_string(&DisplayMessage::Change(event.clone()))?;
        line.push('\n');
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        Ok(())
    }
}
