//! Recursive-descent parser for saved-variables files.
//!
//! Grammar accepted:
//!
//! ```text
//! chunk  := { assignment | ';' }
//! assignment := Name '=' value
//! value  := nil | true | false | ['-'] Number | String | table
//! table  := '{' [ field { (',' | ';') field } [',' | ';'] ] '}'
//! field  := '[' value ']' '=' value | Name '=' value | value
//! ```
//!
//! Nothing is evaluated: names on the right-hand side, function calls and
//! operators other than unary minus are rejected.

use super::error::{ParseError, Position};
use super::lexer::{Lexer, Token, TokenKind};
use super::value::{LuaTable, LuaValue, TableKey};

/// Maximum table nesting accepted before bailing out.
pub const MAX_DEPTH: usize = 256;

/// A top-level `Name = value` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: LuaValue,
    pub at: Position,
}

/// Parser state: a lexer plus one token of lookahead.
#[derive(Debug)]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser and read the first token.
    ///
    /// # Errors
    ///
    /// Returns an error if the first token is malformed.
    pub fn new(src: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            depth: 0,
        })
    }

    /// Parse every top-level assignment in the source.
    ///
    /// # Errors
    ///
    /// Returns the first syntax error encountered.
    pub fn parse_chunk(mut self) -> Result<Vec<Assignment>, ParseError> {
        let mut assignments = Vec::new();

        loop {
            match &self.current.kind {
                TokenKind::Eof => return Ok(assignments),
                TokenKind::Semicolon => {
                    self.advance()?;
                }
                TokenKind::Name(name) => {
                    let name = name.clone();
                    let at = self.current.at;
                    self.advance()?;
                    self.expect(&TokenKind::Assign, "'='")?;
                    let value = self.parse_value()?;
                    assignments.push(Assignment { name, value, at });
                }
                _ => return Err(self.unexpected("assignment")),
            }
        }
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, kind: &TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if &self.current.kind == kind {
            self.advance()
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: self.current.kind.to_string(),
            at: self.current.at,
        }
    }

    /// Look one token past `current` without consuming anything.
    fn peek_next(&self) -> Result<TokenKind, ParseError> {
        self.lexer.clone().next_token().map(|token| token.kind)
    }

    #[allow(clippy::cast_precision_loss)]
    fn parse_value(&mut self) -> Result<LuaValue, ParseError> {
        let value = match &self.current.kind {
            TokenKind::Nil => LuaValue::Nil,
            TokenKind::True => LuaValue::Boolean(true),
            TokenKind::False => LuaValue::Boolean(false),
            TokenKind::Integer(n) => LuaValue::Integer(*n),
            TokenKind::Float(n) => LuaValue::Number(*n),
            TokenKind::Str(s) => LuaValue::String(s.clone()),
            TokenKind::LBrace => return self.parse_table().map(LuaValue::Table),
            TokenKind::Minus => {
                self.advance()?;
                let value = match self.current.kind {
                    TokenKind::Integer(n) => n
                        .checked_neg()
                        .map_or(LuaValue::Number(-(n as f64)), LuaValue::Integer),
                    TokenKind::Float(n) => LuaValue::Number(-n),
                    _ => return Err(self.unexpected("number after '-'")),
                };
                self.advance()?;
                return Ok(value);
            }
            _ => return Err(self.unexpected("value")),
        };
        self.advance()?;
        Ok(value)
    }

    fn parse_table(&mut self) -> Result<LuaTable, ParseError> {
        let open = self.expect(&TokenKind::LBrace, "'{'")?;
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep {
                limit: MAX_DEPTH,
                at: open.at,
            });
        }
        self.depth += 1;

        let mut table = LuaTable::new();
        loop {
            if self.current.kind == TokenKind::RBrace {
                break;
            }

            self.parse_field(&mut table)?;

            match self.current.kind {
                TokenKind::Comma | TokenKind::Semicolon => {
                    self.advance()?;
                }
                TokenKind::RBrace => break,
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }

        self.advance()?;
        self.depth -= 1;
        Ok(table)
    }

    fn parse_field(&mut self, table: &mut LuaTable) -> Result<(), ParseError> {
        match &self.current.kind {
            TokenKind::LBracket => {
                self.advance()?;
                let at = self.current.at;
                let key = Self::table_key(self.parse_value()?, at)?;
                self.expect(&TokenKind::RBracket, "']'")?;
                self.expect(&TokenKind::Assign, "'='")?;
                let value = self.parse_value()?;
                table.insert(key, value);
            }
            TokenKind::Name(name) if self.peek_next()? == TokenKind::Assign => {
                let key = TableKey::Name(name.clone());
                self.advance()?;
                self.advance()?;
                let value = self.parse_value()?;
                table.insert(key, value);
            }
            _ => {
                let value = self.parse_value()?;
                table.push(value);
            }
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn table_key(value: LuaValue, at: Position) -> Result<TableKey, ParseError> {
        match value {
            LuaValue::Integer(i) => Ok(TableKey::Index(i)),
            LuaValue::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                Ok(TableKey::Index(n as i64))
            }
            LuaValue::Number(n) if n.is_nan() => Err(ParseError::InvalidKey {
                reason: "NaN",
                at,
            }),
            LuaValue::Number(n) => Ok(TableKey::Name(n.to_string())),
            LuaValue::String(s) => Ok(TableKey::Name(s)),
            LuaValue::Boolean(b) => Ok(TableKey::Boolean(b)),
            LuaValue::Nil => Err(ParseError::InvalidKey { reason: "nil", at }),
            LuaValue::Table(_) => Err(ParseError::InvalidKey {
                reason: "table",
                at,
            }),
        }
    }
}

/// Parse all top-level assignments of `src`.
///
/// # Errors
///
/// Returns the first syntax error encountered.
pub fn parse_chunk(src: &str) -> Result<Vec<Assignment>, ParseError> {
    Parser::new(src)?.parse_chunk()
}
