//! Table-literal parse errors.

use std::fmt;

/// A 1-based line/column location in the source text.
///
/// Columns count bytes, not characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors produced while tokenizing or parsing a table literal.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A character that cannot start any token.
    #[error("{at}: unexpected character {found:?}")]
    UnexpectedChar { found: char, at: Position },

    /// A quoted string reached end of line or end of input.
    #[error("{at}: unterminated string")]
    UnterminatedString { at: Position },

    /// A `[[ ... ]]` string or `--[[ ... ]]` comment was never closed.
    #[error("{at}: unterminated long bracket")]
    UnterminatedLongBracket { at: Position },

    /// Unknown or malformed backslash escape inside a string.
    #[error("{at}: invalid escape sequence in string")]
    InvalidEscape { at: Position },

    /// A numeric literal that does not fit the grammar or an `i64`.
    #[error("{at}: malformed number {text:?}")]
    MalformedNumber { text: String, at: Position },

    /// A well-formed token in the wrong place.
    #[error("{at}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        at: Position,
    },

    /// A `[key] = value` field whose key cannot index a table.
    #[error("{at}: invalid table key ({reason})")]
    InvalidKey { reason: &'static str, at: Position },

    /// Tables nested deeper than the parser is willing to recurse.
    #[error("{at}: tables nested deeper than {limit} levels")]
    TooDeep { limit: usize, at: Position },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let at = Position { line: 3, column: 14 };
        assert_eq!(at.to_string(), "line 3, column 14");
    }

    #[test]
    fn test_unexpected_token_display() {
        let err = ParseError::UnexpectedToken {
            expected: "value",
            found: "'}'".to_string(),
            at: Position { line: 1, column: 26 },
        };
        assert_eq!(err.to_string(), "line 1, column 26: expected value, found '}'");
    }
}
