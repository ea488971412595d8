//! Table-literal reader for saved-variables files.
//!
//! Saved-variables files are a series of `Name = <literal>` statements. This
//! module tokenizes and parses them without evaluating anything, then offers
//! a generic conversion of the parsed literals into [`serde_json::Value`].
//!
//! ```
//! use buggrabber_viewer::lua::find_assignment;
//! use serde_json::json;
//!
//! let value = find_assignment("Foo = { 1, 2, bar = 'x' }", "Foo").unwrap().unwrap();
//! assert_eq!(value.to_json(), json!({"1": 1, "2": 2, "bar": "x"}));
//! ```

mod error;
mod lexer;
mod parser;
mod value;

pub use error::{ParseError, Position};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_chunk, Assignment, Parser, MAX_DEPTH};
pub use value::{LuaTable, LuaValue, TableKey};

/// Parse `src` and return the value assigned to `name`.
///
/// If `name` is assigned more than once the last assignment wins. Returns
/// `Ok(None)` when the source is well formed but never assigns `name`.
///
/// # Errors
///
/// Returns the first syntax error in `src`, even if it occurs after the
/// assignment of interest.
pub fn find_assignment(src: &str, name: &str) -> Result<Option<LuaValue>, ParseError> {
    Ok(parse_chunk(src)?
        .into_iter()
        .rev()
        .find(|assignment| assignment.name == name)
        .map(|assignment| assignment.value))
}
