//! IPC server for the display process.
//!
//! Listens on a Unix domain socket and forwards every change event it
//! receives to a channel, in the order connections are accepted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};

use crate::ipc::{ChangeEvent, DisplayMessage, IpcError};

/// How long one connection may take to deliver its events and close.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// IPC server receiving change events from a pipeline process.
#[derive(Debug)]
pub struct DisplayServer {
    socket_path: PathBuf,
    read_timeout: Duration,
}

impl DisplayServer {
    /// Creates a new IPC server with a custom socket path.
    #[must_use]
    pub fn new<P: AsRef<Path>>(socket_path: P) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Drop connections that have not closed within `timeout`.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Starts accepting connections.
    ///
    /// Returns a handle that stops the server when dropped, and the receiver
    /// change events are forwarded to. Connections are served one at a
    /// time so events come out in the order they were sent; a connection
    /// that stays open past the read timeout is dropped so it cannot stall
    /// the ones behind it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the socket.
    pub fn start(&self) -> Result<(ServerHandle, mpsc::UnboundedReceiver<ChangeEvent>), IpcError> {
        // Remove existing socket file if it exists
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        let read_timeout = self.read_timeout;

        tracing::info!(path = %self.socket_path.display(), "Display server started");

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let stream = tokio::select! {
                    biased;

                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }

                    accept_result = listener.accept() => match accept_result {
                        Ok((stream, _addr)) => stream,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    },
                };

                let served = tokio::select! {
                    biased;

                    _ = shutdown_rx.changed() => break,

                    served = tokio::time::timeout(read_timeout, handle_connection(stream, &event_tx)) => served,
                };

                match served {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Connection handler error"),
                    Err(_) => tracing::warn!(
                        timeout = ?read_timeout,
                        "Dropping connection that did not close in time"
                    ),
                }

                if event_tx.is_closed() {
                    break;
                }
            }

            tracing::info!("Display server shutting down");
        });

        Ok((
            ServerHandle {
                socket_path: self.socket_path.clone(),
                shutdown_tx,
            },
            event_rx,
        ))
    }
}

/// Handle for a running display server.
///
/// When dropped, the socket file is cleaned up.
#[derive(Debug)]
pub struct ServerHandle {
    socket_path: PathBuf,
    shutdown_tx: watch::Sender<bool>,
}

impl ServerHandle {
    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        // Signal shutdown
        let _ = self.shutdown_tx.send(true);

        // Clean up socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                tracing::warn!(
                    path = %self.socket_path.display(),
                    error = %e,
                    "Failed to remove socket file"
                );
            }
        }
    }
}

/// Reads JSON lines from one connection until it closes.
///
/// Lines that fail to parse are logged and skipped.
async fn handle_connection(
    stream: UnixStream,
    event_tx: &mpsc::UnboundedSender<ChangeEvent>,
) -> Result<(), IpcError> {
    let mut lines = BufReader::new(stream).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<DisplayMessage>(line) {
            Ok(DisplayMessage::Change(event)) => {
                tracing::debug!(
                    path = %event.path.display(),
                    has_record = event.db.is_some(),
                    "Received change"
                );
                event_tx
                    .send(event)
                    .map_err(|_| IpcError::DisplayDetached)?;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed message");
            }
        }
    }

    Ok(())
}
