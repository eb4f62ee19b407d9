//! Fundamental components of the token stream.
use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// A 1-based line and column in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Move past the char `ch`.
    pub(crate) fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// The `@` starting a declaration.
    EntryDelim,
    /// The `{` or `(` opening a declaration body.
    LeftDelim,
    /// The `}` or `)` closing a declaration body.
    RightDelim,
    /// The `=` between a field name and its text.
    EqSign,
    /// The `,` separating the cite key and fields.
    Comma,
    /// A citation key, such as `key` in `@article{key, ...`.
    CiteKey,
    /// A regular entry type, such as `article` in `@article{...`.
    EntryType,
    /// Text outside of declarations, or a `%` line inside of one.
    Comment,
    /// The `string` keyword, matched case-insensitively.
    Abbrev,
    /// The `preamble` keyword, matched case-insensitively.
    Preamble,
    /// A field name, such as `title` in `title = {Title}`.
    FieldType,
    /// A field value with its delimiters, such as `{Title}` in `title = {Title}`.
    FieldText,
    /// The input is exhausted.
    Eof,
    /// The input is malformed.
    Error,
}

impl TokenKind {
    /// Whether no further tokens can follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Eof | Self::Error)
    }

    fn describe(self) -> &'static str {
        match self {
            Self::EntryDelim => "'@'",
            Self::LeftDelim => "opening delimiter",
            Self::RightDelim => "closing delimiter",
            Self::EqSign => "'='",
            Self::Comma => "','",
            Self::CiteKey => "cite key",
            Self::EntryType => "entry type",
            Self::Comment => "comment",
            Self::Abbrev => "'string' keyword",
            Self::Preamble => "'preamble' keyword",
            Self::FieldType => "field name",
            Self::FieldText => "field text",
            Self::Eof => "end of input",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A single lexical element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

/// A pull-based producer of tokens.
///
/// After producing a terminal token ([`TokenKind::Eof`] or [`TokenKind::Error`]), every
/// subsequent call must produce the same terminal kind.
pub trait TokenStream {
    /// Produce the next token.
    fn next_token(&mut self) -> Token;

    /// The cause of a [`TokenKind::Error`] token, if one was produced.
    fn error(&self) -> Option<&Error> {
        None
    }
}

impl<T: TokenStream + ?Sized> TokenStream for &mut T {
    fn next_token(&mut self) -> Token {
        (**self).next_token()
    }

    fn error(&self) -> Option<&Error> {
        (**self).error()
    }
}
