//! BugGrabber Viewer - live view of the errors World of Warcraft's
//! `!BugGrabber` addon saves to disk.

pub mod config;
pub mod display;
pub mod ipc;
pub mod lua;
pub mod notifier;
pub mod pipeline;
pub mod savefile;
pub mod watcher;
