//! The `!BugGrabber` save file: record types and parsing.
//!
//! The addon persists its error database as a single
//! `BugGrabberDB = { ... }` assignment. Parsing never evaluates the file;
//! see [`crate::lua`] for the literal reader.

mod error;
mod reader;
mod types;

pub use error::SaveFileError;
pub use reader::{load_save_file, parse_save_file, read_save_file, SAVED_VARIABLE};
pub use types::{ErrorEntry, ParsedRecord};
