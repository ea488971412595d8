//! Locating and watching `!BugGrabber` save files.
//!
//! [`locate`] walks a directory tree once and reports matching files;
//! [`SaveFileWatcher`] then reports every creation or change of those files.

mod discovery;
mod error;
mod file_watcher;

pub use discovery::{
    has_name_suffix, locate, locate_save_files, ScanFailure, ScanResult, SAVE_FILE_NAME,
};
pub use error::WatcherError;
pub use file_watcher::{classify, SaveFileWatcher, WatchEvent};
