//! # The character-level state machine
//!
//! The [`Scanner`] reads one char at a time from a [`RuneSource`] and emits [`Token`]s on
//! demand. Each call to [`TokenStream::next_token`] runs state handlers until at least one
//! token is available, so the scanner never holds more than a couple of tokens.
//!
//! The scanner tracks the flavor of the opening body delimiter, the nesting depth of brackets
//! and the parity of quotes inside field text, so that a `,` or a closing bracket inside a
//! value is not mistaken for the end of the value.
//!
//! Once the scanner hits the end of input or an error it keeps returning the same terminal
//! token.
use std::collections::VecDeque;
use std::io::Read;

use unicase::UniCase;

use crate::error::{Error, LexicalError};
use crate::read::{IoSource, RuneSource, StrSource, Tracked};
use crate::token::{Position, Token, TokenKind, TokenStream, check_field_text, check_name, is_name_char};

/// Read the next char, or leave the current handler with the state the read resulted in.
macro_rules! next_char {
    ($scanner:expr) => {
        match $scanner.read() {
            Ok(ch) => ch,
            Err(state) => return state,
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    TopLevel,
    EntryDelim,
    EntryType,
    LeftDelim,
    CiteKey,
    Comma,
    TypeOrClose,
    Comment,
    FieldType,
    EqSign,
    FieldText,
    RightDelim,
    Eof,
    Error,
}

/// The sub-grammar of the declaration body currently being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Entry,
    Preamble,
    Abbrev,
}

/// Classify an entry type. The keywords are matched case-insensitively.
fn classify(name: &str) -> (Body, TokenKind) {
    let name = UniCase::new(name);
    if name == UniCase::ascii("preamble") {
        (Body::Preamble, TokenKind::Preamble)
    } else if name == UniCase::ascii("string") {
        (Body::Abbrev, TokenKind::Abbrev)
    } else {
        (Body::Entry, TokenKind::EntryType)
    }
}

/// The closing delimiter matching an opening delimiter.
fn closing(open: char) -> char {
    if open == '(' { ')' } else { '}' }
}

/// Text accumulated for a single token.
#[derive(Debug, Default)]
struct Lexeme {
    text: String,
    start: Option<Position>,
}

impl Lexeme {
    fn push(&mut self, ch: char, at: Position) {
        if self.start.is_none() && !ch.is_whitespace() {
            self.start = Some(at);
        }
        self.text.push(ch);
    }

    /// The trimmed text, and the position of its first char.
    fn finish(self, fallback: Position) -> (String, Position) {
        let position = self.start.unwrap_or(fallback);
        (self.text.trim().to_owned(), position)
    }
}

/// Converts a stream of chars into a stream of [`Token`]s.
#[derive(Debug)]
pub struct Scanner<R> {
    reader: Tracked<R>,
    pending: VecDeque<Token>,
    state: State,
    body: Body,
    open: char,
    depth: usize,
    error: Option<Error>,
    exhausted: bool,
}

impl<R: RuneSource> Scanner<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: Tracked::new(source),
            pending: VecDeque::with_capacity(2),
            state: State::Start,
            body: Body::Entry,
            open: '{',
            depth: 0,
            error: None,
            exhausted: false,
        }
    }

    /// The current nesting depth of brackets, counting the body delimiter.
    ///
    /// This is zero between declarations, so a consumer which stops pulling tokens can tell
    /// whether it stopped inside an open declaration.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn step(&mut self) -> State {
        match self.state {
            State::Start => State::TopLevel,
            State::TopLevel => self.top_level(),
            State::EntryDelim => self.entry_delim(),
            State::EntryType => self.entry_type(),
            State::LeftDelim => self.left_delim(),
            State::CiteKey => self.cite_key(),
            State::Comma => self.comma(),
            State::TypeOrClose => self.type_or_close(),
            State::Comment => self.comment(),
            State::FieldType => self.field_type(),
            State::EqSign => self.eq_sign(),
            State::FieldText => self.field_text(),
            State::RightDelim => self.right_delim(),
            State::Eof => {
                self.emit(TokenKind::Eof, "", self.reader.mark());
                State::Eof
            }
            State::Error => {
                self.emit(TokenKind::Error, "", self.reader.mark());
                State::Error
            }
        }
    }

    fn read(&mut self) -> Result<char, State> {
        match self.reader.next_char() {
            Ok(Some(ch)) => Ok(ch),
            Ok(None) => Err(match self.state {
                State::Start | State::TopLevel | State::EntryDelim => State::Eof,
                _ => self.fail(LexicalError::UnexpectedEof),
            }),
            Err(err) => Err(self.fail_with(err.into())),
        }
    }

    /// Push back the last char read, and move to `next`.
    fn unread(&mut self, next: State) -> State {
        match self.reader.pushback() {
            Ok(()) => next,
            Err(err) => self.fail_with(err.into()),
        }
    }

    fn emit(&mut self, kind: TokenKind, text: impl Into<String>, position: Position) {
        self.pending.push_back(Token::new(kind, text, position));
    }

    fn emit_char(&mut self, kind: TokenKind, ch: char) {
        self.emit(kind, ch, self.reader.mark());
    }

    fn fail(&mut self, code: LexicalError) -> State {
        self.fail_with(Error::lexical(code, self.reader.mark()))
    }

    fn fail_with(&mut self, error: Error) -> State {
        tracing::debug!(%error, "scanner entered error state");
        self.error = Some(error);
        State::Error
    }

    /// Emit a trimmed comment, unless it is empty.
    fn emit_comment(&mut self, buf: Lexeme) {
        let (text, position) = buf.finish(self.reader.mark());
        if !text.is_empty() {
            self.emit(TokenKind::Comment, text, position);
        }
    }

    /// Validate and emit a NAME token.
    fn emit_name(&mut self, kind: TokenKind, buf: Lexeme) -> Result<(), State> {
        let (name, position) = buf.finish(self.reader.mark());
        match check_name(&name) {
            Ok(()) => {
                self.emit(kind, name, position);
                Ok(())
            }
            Err(reason) => Err(self.fail(LexicalError::InvalidName { name, reason })),
        }
    }

    /// Reject a char which cannot appear in the NAME being accumulated in `buf`.
    fn invalid_name(&mut self, mut buf: Lexeme, ch: char) -> State {
        buf.text.push(ch);
        let name = buf.text.trim().to_owned();
        self.fail(LexicalError::InvalidName {
            name,
            reason: crate::token::TokenError::InvalidChar(ch),
        })
    }

    /// Everything up to the next `@` is a comment.
    fn top_level(&mut self) -> State {
        let mut buf = Lexeme::default();
        loop {
            let ch = match self.read() {
                Ok(ch) => ch,
                Err(State::Eof) => {
                    self.emit_comment(buf);
                    return State::Eof;
                }
                Err(state) => return state,
            };

            if ch == '@' {
                self.emit_comment(buf);
                return self.unread(State::EntryDelim);
            }
            buf.push(ch, self.reader.mark());
        }
    }

    fn entry_delim(&mut self) -> State {
        loop {
            if next_char!(self) == '@' {
                self.emit_char(TokenKind::EntryDelim, '@');
                return State::EntryType;
            }
        }
    }

    fn entry_type(&mut self) -> State {
        let mut buf = Lexeme::default();
        loop {
            match next_char!(self) {
                '{' | '(' => {
                    let (body, kind) = classify(buf.text.trim());
                    if let Err(state) = self.emit_name(kind, buf) {
                        return state;
                    }
                    self.body = body;
                    return self.unread(State::LeftDelim);
                }
                ch if ch.is_whitespace() || is_name_char(ch) => buf.push(ch, self.reader.mark()),
                ch => return self.invalid_name(buf, ch),
            }
        }
    }

    fn left_delim(&mut self) -> State {
        loop {
            match next_char!(self) {
                ch @ ('{' | '(') => {
                    self.emit_char(TokenKind::LeftDelim, ch);
                    self.open = ch;
                    self.depth += 1;
                    return match self.body {
                        Body::Entry => State::CiteKey,
                        Body::Preamble => State::FieldText,
                        Body::Abbrev => State::FieldType,
                    };
                }
                ch if ch.is_whitespace() => {}
                ch => return self.fail(LexicalError::UnexpectedChar(ch)),
            }
        }
    }

    fn cite_key(&mut self) -> State {
        let mut buf = Lexeme::default();
        loop {
            match next_char!(self) {
                ',' => {
                    if let Err(state) = self.emit_name(TokenKind::CiteKey, buf) {
                        return state;
                    }
                    return self.unread(State::Comma);
                }
                // an entry without any fields
                '}' | ')' => {
                    if let Err(state) = self.emit_name(TokenKind::CiteKey, buf) {
                        return state;
                    }
                    return self.unread(State::RightDelim);
                }
                '@' => return self.fail(LexicalError::NestedEntry),
                ch => buf.push(ch, self.reader.mark()),
            }
        }
    }

    fn comma(&mut self) -> State {
        loop {
            match next_char!(self) {
                ',' => {
                    self.emit_char(TokenKind::Comma, ',');
                    return State::TypeOrClose;
                }
                ch if ch.is_whitespace() => {}
                ch => return self.fail(LexicalError::UnexpectedChar(ch)),
            }
        }
    }

    /// After a comma, decide between a field name, the end of the body and a comment.
    fn type_or_close(&mut self) -> State {
        loop {
            match next_char!(self) {
                '}' | ')' => return self.unread(State::RightDelim),
                '%' => return State::Comment,
                '@' => return self.fail(LexicalError::NestedEntry),
                ch if ch.is_whitespace() => {}
                ch if is_name_char(ch) => return self.unread(State::FieldType),
                ch => return self.fail(LexicalError::UnexpectedChar(ch)),
            }
        }
    }

    /// A `%` comment inside a body. The `%` has already been consumed.
    fn comment(&mut self) -> State {
        let mut buf = Lexeme::default();
        loop {
            match next_char!(self) {
                '\n' => break,
                ch => buf.push(ch, self.reader.mark()),
            }
        }
        self.emit_comment(buf);

        // resume whatever the comment interrupted
        loop {
            match next_char!(self) {
                '%' => return State::Comment,
                '}' | ')' => return self.unread(State::RightDelim),
                ',' => return self.unread(State::Comma),
                '@' => return self.fail(LexicalError::NestedEntry),
                ch if ch.is_whitespace() => {}
                ch if is_name_char(ch) => return self.unread(State::FieldType),
                ch => return self.fail(LexicalError::UnexpectedChar(ch)),
            }
        }
    }

    fn field_type(&mut self) -> State {
        let mut buf = Lexeme::default();
        loop {
            match next_char!(self) {
                '=' => {
                    if let Err(state) = self.emit_name(TokenKind::FieldType, buf) {
                        return state;
                    }
                    return self.unread(State::EqSign);
                }
                '@' => return self.fail(LexicalError::NestedEntry),
                ch if ch.is_whitespace() || is_name_char(ch) => buf.push(ch, self.reader.mark()),
                ch => return self.invalid_name(buf, ch),
            }
        }
    }

    fn eq_sign(&mut self) -> State {
        loop {
            match next_char!(self) {
                '=' => {
                    self.emit_char(TokenKind::EqSign, '=');
                    return State::FieldText;
                }
                ch if ch.is_whitespace() => {}
                ch => return self.fail(LexicalError::UnexpectedChar(ch)),
            }
        }
    }

    /// Scan a field value, keeping its delimiters.
    ///
    /// The value ends at a `,` outside of brackets and quotes, at a `%` or at the closing
    /// delimiter of the body. A quote preceded by a backslash does not count towards the
    /// quote parity.
    fn field_text(&mut self) -> State {
        let mut buf = Lexeme::default();
        let close = closing(self.open);
        let mut quotes = 0usize;
        let mut prev = None;

        loop {
            let ch = next_char!(self);
            match ch {
                '{' => self.depth += 1,
                '"' if prev != Some('\\') => quotes += 1,
                // the other closer ends the value outside of quotes, to be reported as a mismatch
                '}' | ')' if self.depth == 1 && (ch == close || quotes % 2 == 0) => {
                    return match self.emit_field_text(buf) {
                        Ok(()) => self.unread(State::RightDelim),
                        Err(state) => state,
                    };
                }
                '%' if self.depth == 1 => {
                    return match self.emit_field_text(buf) {
                        Ok(()) => State::Comment,
                        Err(state) => state,
                    };
                }
                '}' if self.depth > 1 => self.depth -= 1,
                ',' if self.depth == 1 && quotes % 2 == 0 => {
                    return match self.emit_field_text(buf) {
                        Ok(()) => self.unread(State::Comma),
                        Err(state) => state,
                    };
                }
                _ => {}
            }
            buf.push(ch, self.reader.mark());
            prev = Some(ch);
        }
    }

    fn emit_field_text(&mut self, buf: Lexeme) -> Result<(), State> {
        let (text, position) = buf.finish(self.reader.mark());
        match check_field_text(&text) {
            Ok(()) => {
                self.emit(TokenKind::FieldText, text, position);
                Ok(())
            }
            Err(reason) => Err(self.fail(LexicalError::InvalidFieldText { text, reason })),
        }
    }

    fn right_delim(&mut self) -> State {
        loop {
            match next_char!(self) {
                ch @ ('}' | ')') => {
                    if ch != closing(self.open) {
                        return self.fail(LexicalError::MismatchedDelimiter {
                            open: self.open,
                            close: ch,
                        });
                    }
                    self.emit_char(TokenKind::RightDelim, ch);
                    self.depth = self.depth.saturating_sub(1);
                    return State::TopLevel;
                }
                ch if ch.is_whitespace() => {}
                ch => return self.fail(LexicalError::UnexpectedChar(ch)),
            }
        }
    }
}

impl<'r> Scanner<StrSource<'r>> {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &'r str) -> Self {
        Self::new(StrSource::new(input))
    }
}

impl<R: Read> Scanner<IoSource<R>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(IoSource::new(reader))
    }
}

impl<R: RuneSource> TokenStream for Scanner<R> {
    fn next_token(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.pop_front() {
                tracing::trace!(kind = ?token.kind, text = %token.text, "token");
                return token;
            }
            self.state = self.step();
        }
    }

    fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

/// Yields every token up to and including the first terminal token.
impl<R: RuneSource> Iterator for Scanner<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let token = self.next_token();
        self.exhausted = token.is_terminal();
        Some(token)
    }
}
