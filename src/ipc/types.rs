//! IPC message types.
//!
//! This module defines the message pushed from the pipeline process to the
//! display process.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::savefile::ParsedRecord;

/// Name of the change notification on the wire.
pub const CHANGE_EVENT: &str = "BugGrabberDB_Change";

/// A freshly parsed save file, or the failure to parse one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    /// The save file that was (re)read.
    pub path: PathBuf,
    /// The parsed database, or `None` if the file could not be read or parsed.
    pub db: Option<ParsedRecord>,
}

/// Messages understood by the display process.
///
/// Serialized as one JSON object per line, tagged by `event`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum DisplayMessage {
    #[serde(rename = "BugGrabberDB_Change")]
    Change(ChangeEvent),
}

/// Errors that can occur while delivering to a display.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Failed to connect to or write to the display socket.
    #[error("Failed to connect to display: {0}")]
    ConnectionFailed(#[from] std::io::Error),

    /// The display socket does not exist or nobody is listening on it.
    #[error("Display not running (socket not found)")]
    DisplayNotRunning,

    /// The in-process display has gone away.
    #[error("Display channel closed")]
    DisplayDetached,

    /// Failed to serialize or deserialize a message.
    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),
}
