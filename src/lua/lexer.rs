//! Tokenizer for the save-file table-literal dialect.
//!
//! Skips whitespace and `--` comments and produces one [`Token`] at a time.
//! Only the subset of the language that appears in saved-variable files is
//! recognized; anything else surfaces as a [`ParseError`].

use std::fmt;

use super::error::{ParseError, Position};

/// Kinds of tokens in a table literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Str(String),
    Integer(i64),
    Float(f64),
    True,
    False,
    Nil,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Assign,
    Comma,
    Semicolon,
    Minus,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name '{name}'"),
            Self::Str(_) => f.write_str("string"),
            Self::Integer(n) => write!(f, "number {n}"),
            Self::Float(n) => write!(f, "number {n}"),
            Self::True => f.write_str("'true'"),
            Self::False => f.write_str("'false'"),
            Self::Nil => f.write_str("'nil'"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Assign => f.write_str("'='"),
            Self::Comma => f.write_str("','"),
            Self::Semicolon => f.write_str("';'"),
            Self::Minus => f.write_str("'-'"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

/// A token and the position of its first byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub at: Position,
}

/// Byte-oriented lexer over a source string.
///
/// Cloning is cheap and is how the parser looks ahead.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer positioned at the start of `src`.
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn current_char(&self) -> char {
        let end = (self.pos + 4).min(self.src.len());
        String::from_utf8_lossy(&self.src[self.pos..end])
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    /// Produce the next token, or [`TokenKind::Eof`] once input is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error for characters that cannot start a token and for
    /// malformed strings, numbers, or unterminated comments.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia()?;

        let at = self.position();
        let Some(byte) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                at,
            });
        };

        let kind = match byte {
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b']' => self.single(TokenKind::RBracket),
            b'=' => self.single(TokenKind::Assign),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semicolon),
            b'-' => self.single(TokenKind::Minus),
            b'[' => match self.long_bracket_level() {
                Some(level) => TokenKind::Str(self.read_long_bracket(level, at)?),
                None => self.single(TokenKind::LBracket),
            },
            b'"' | b'\'' => TokenKind::Str(self.read_string(byte, at)?),
            b'0'..=b'9' => self.read_number(at)?,
            b'.' if self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) => {
                self.read_number(at)?
            }
            b if b.is_ascii_alphabetic() || b == b'_' => self.read_name(),
            _ => {
                return Err(ParseError::UnexpectedChar {
                    found: self.current_char(),
                    at,
                })
            }
        };

        Ok(Token { kind, at })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    let at = self.position();
                    self.bump();
                    self.bump();
                    if let Some(level) = self.long_bracket_level() {
                        self.read_long_bracket(level, at)?;
                    } else {
                        while let Some(b) = self.peek() {
                            if b == b'\n' {
                                break;
                            }
                            self.bump();
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// If the input is at `[`, `[=`, `[==` ... followed by `[`, return the
    /// number of `=` signs without consuming anything.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    fn read_long_bracket(&mut self, level: usize, at: Position) -> Result<String, ParseError> {
        // Opening `[`, `=` * level, `[`.
        for _ in 0..level + 2 {
            self.bump();
        }

        // A newline right after the opening bracket is not part of the string.
        match (self.peek(), self.peek_at(1)) {
            (Some(b'\r'), Some(b'\n')) | (Some(b'\n'), Some(b'\r')) => {
                self.bump();
                self.bump();
            }
            (Some(b'\n' | b'\r'), _) => {
                self.bump();
            }
            _ => {}
        }

        let mut buf = Vec::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::UnterminatedLongBracket { at }),
                Some(b']') if self.closes_long_bracket(level) => {
                    for _ in 0..level + 2 {
                        self.bump();
                    }
                    return Ok(String::from_utf8_lossy(&buf).into_owned());
                }
                Some(b) => {
                    buf.push(b);
                    self.bump();
                }
            }
        }
    }

    fn closes_long_bracket(&self, level: usize) -> bool {
        (1..=level).all(|i| self.peek_at(i) == Some(b'=')) && self.peek_at(level + 1) == Some(b']')
    }

    fn read_string(&mut self, quote: u8, at: Position) -> Result<String, ParseError> {
        self.bump();
        let mut buf = Vec::new();

        loop {
            match self.peek() {
                None | Some(b'\n' | b'\r') => return Err(ParseError::UnterminatedString { at }),
                Some(b) if b == quote => {
                    self.bump();
                    return Ok(String::from_utf8_lossy(&buf).into_owned());
                }
                Some(b'\\') => {
                    self.bump();
                    self.read_escape(&mut buf)?;
                }
                Some(b) => {
                    buf.push(b);
                    self.bump();
                }
            }
        }
    }

    fn read_escape(&mut self, buf: &mut Vec<u8>) -> Result<(), ParseError> {
        let at = self.position();
        let invalid = ParseError::InvalidEscape { at };
        let Some(byte) = self.bump() else {
            return Err(ParseError::UnterminatedString { at });
        };

        match byte {
            b'n' => buf.push(b'\n'),
            b't' => buf.push(b'\t'),
            b'r' => buf.push(b'\r'),
            b'a' => buf.push(0x07),
            b'b' => buf.push(0x08),
            b'f' => buf.push(0x0C),
            b'v' => buf.push(0x0B),
            b'\\' | b'"' | b'\'' => buf.push(byte),
            b'\n' => {
                if self.peek() == Some(b'\r') {
                    self.bump();
                }
                buf.push(b'\n');
            }
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.bump();
                }
                buf.push(b'\n');
            }
            b'z' => {
                while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                    self.bump();
                }
            }
            b'x' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    let digit = self
                        .peek()
                        .and_then(|b| char::from(b).to_digit(16))
                        .ok_or_else(|| invalid.clone())?;
                    self.bump();
                    value = value * 16 + digit;
                }
                buf.push(u8::try_from(value).map_err(|_| invalid.clone())?);
            }
            b'0'..=b'9' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(b) if b.is_ascii_digit() => {
                            value = value * 10 + u32::from(b - b'0');
                            self.bump();
                        }
                        _ => break,
                    }
                }
                let value = u8::try_from(value).map_err(|_| invalid.clone())?;
                buf.push(value);
            }
            b'u' => {
                if self.bump() != Some(b'{') {
                    return Err(invalid);
                }
                let mut code: u32 = 0;
                let mut digits = 0;
                while let Some(digit) = self.peek().and_then(|b| char::from(b).to_digit(16)) {
                    code = code
                        .checked_mul(16)
                        .and_then(|c| c.checked_add(digit))
                        .ok_or_else(|| invalid.clone())?;
                    digits += 1;
                    self.bump();
                }
                if digits == 0 || self.bump() != Some(b'}') {
                    return Err(invalid);
                }
                let ch = char::from_u32(code).ok_or(invalid)?;
                let mut encoded = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
            }
            _ => return Err(invalid),
        }

        Ok(())
    }

    fn read_number(&mut self, at: Position) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let is_hex = self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X'));

        if is_hex {
            self.bump();
            self.bump();
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.bump();
            }
        } else {
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.bump();
            }
            if self.peek() == Some(b'.') {
                self.bump();
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.bump();
                }
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                self.bump();
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.bump();
                }
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.bump();
                }
            }
        }

        // Swallow trailing name characters so `12abc` reports as one bad number.
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
        {
            self.bump();
        }

        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        let malformed = || ParseError::MalformedNumber {
            text: text.clone(),
            at,
        };

        if is_hex {
            return i64::from_str_radix(&text[2..], 16)
                .map(TokenKind::Integer)
                .map_err(|_| malformed());
        }

        if text.contains(['.', 'e', 'E']) {
            return text
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| malformed());
        }

        match text.parse::<i64>() {
            Ok(n) => Ok(TokenKind::Integer(n)),
            // Decimal integers that overflow become floats.
            Err(_) if text.bytes().all(|b| b.is_ascii_digit()) => text
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| malformed()),
            Err(_) => Err(malformed()),
        }
    }

    fn read_name(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.bump();
        }
        let name = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        match name.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            _ => TokenKind::Name(name),
        }
    }
}
