use std::io;

use thiserror::Error;

use crate::token::{Position, TokenError, TokenKind};

pub type Result<T> = std::result::Result<T, Error>;

/// Any failure which terminates a [`Scanner`](crate::Scanner) or [`Parser`](crate::Parser).
///
/// Once either machine reports an error it never produces valid output again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The character stream does not form valid tokens.
    #[error("lexical error at {position}: {code}")]
    Lexical {
        code: LexicalError,
        position: Position,
    },
    /// The token stream does not form valid declarations.
    #[error("syntax error at {position}: {code}")]
    Syntax {
        code: SyntaxError,
        position: Position,
    },
    /// The underlying character source failed.
    #[error("read error: {0}")]
    Read(#[from] ReadError),
}

impl Error {
    pub(crate) fn lexical(code: LexicalError, position: Position) -> Self {
        Self::Lexical { code, position }
    }

    pub(crate) fn syntax(code: SyntaxError, position: Position) -> Self {
        Self::Syntax { code, position }
    }

    /// The position at which the error was detected, if known.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Lexical { position, .. } | Self::Syntax { position, .. } => Some(*position),
            Self::Read(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexicalError {
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: TokenError },
    #[error("invalid field text '{text}': {reason}")]
    InvalidFieldText { text: String, reason: TokenError },
    #[error("body opened with '{open}' cannot be closed with '{close}'")]
    MismatchedDelimiter { open: char, close: char },
    #[error("unexpected '@' inside an open declaration")]
    NestedEntry,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of input inside an open declaration")]
    UnexpectedEof,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
    },
    #[error("entry is missing its cite key")]
    MissingCiteKey,
    #[error("field value has no key")]
    EmptyFieldKey,
    #[error("field has an empty value")]
    EmptyFieldValue,
    #[error("{0} declaration closed before it was complete")]
    IncompleteDeclaration(&'static str),
    #[error("unexpected end of input inside a declaration")]
    UnexpectedEof,
    #[error("token stream reported an unspecified error")]
    Upstream,
}

/// Failures of a [`RuneSource`](crate::RuneSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("{message}")]
    Io { kind: io::ErrorKind, message: String },
    #[error("input is not valid UTF-8")]
    InvalidUtf8,
    #[error("no character available to push back")]
    Pushback,
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
