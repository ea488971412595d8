//! Save file error types.

use std::path::PathBuf;

use crate::lua::ParseError;

/// Errors that can occur while turning a save file into a record.
#[derive(thiserror::Error, Debug)]
pub enum SaveFileError {
    /// The file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The content is not a well-formed table literal.
    #[error("Syntax error: {0}")]
    Syntax(#[from] ParseError),

    /// The content parsed but never assigns the saved variable.
    #[error("No `{0} = ...` assignment found")]
    MissingAssignment(&'static str),

    /// The saved variable is assigned something other than a table.
    #[error("`{0}` is not a table")]
    NotATable(&'static str),

    /// The table does not have the layout of an error database.
    #[error("Unexpected save data layout: {0}")]
    Shape(#[from] serde_json::Error),
}
