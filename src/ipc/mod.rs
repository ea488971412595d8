//! IPC between the pipeline and a display process.
//!
//! # Architecture
//!
//! ```text
//! Pipeline (watch)                 Display
//!     |                              |
//!     |-- BugGrabberDB_Change ------>|
//!     |                              | (render)
//! ```
//!
//! # Protocol
//!
//! Each change is pushed over a fresh Unix domain socket connection as one
//! JSON object followed by a newline. The display never replies; if it is
//! not running the change is dropped.

#[cfg(unix)]
pub mod client;
#[cfg(unix)]
pub mod server;
pub mod types;

#[cfg(unix)]
pub use client::DisplayClient;
#[cfg(unix)]
pub use server::{DisplayServer, ServerHandle};
pub use types::{ChangeEvent, DisplayMessage, IpcError, CHANGE_EVENT};

/// Default socket path for display IPC.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/buggrabber-viewer.sock";
