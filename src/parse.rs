//! # The token-level state machine
//!
//! The [`Parser`] pulls [`Token`]s from any [`TokenStream`] and assembles them into
//! [`Declaration`]s. Comments are gathered into a pending [`CommentGroup`] which is attached to
//! the next declaration emitted, so a comment inside an entry body lands in the same group as
//! the comments preceding the entry.
//!
//! The parser stops at the first problem. An error reported by the token stream is passed
//! through unchanged, and any token which does not fit the current state is a
//! [`SyntaxError`].
use std::io::Read;
use std::mem;

use crate::decl::{AbbrevDecl, CommentGroup, Declaration, EntryDecl, FieldStmt, PreambleDecl};
use crate::error::{Error, Result, SyntaxError};
use crate::read::{IoSource, StrSource};
use crate::scan::Scanner;
use crate::token::{Token, TokenKind, TokenStream};

/// Options for a [`Parser`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// Lowercase the type name of regular entries, so that `@Book` and `@book` agree.
    pub lowercase_entry_types: bool,
    /// Drop comments instead of attaching them to declarations.
    pub discard_comments: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Comments,
    Declaration,
    Entry { type_name: String },
    Preamble,
    Abbrev,
    Eof,
    Error,
}

/// Converts a stream of [`Token`]s into a stream of [`Declaration`]s.
#[derive(Debug)]
pub struct Parser<T> {
    tokens: T,
    pub config: ParserConfig,
    state: State,
    comments: CommentGroup,
    pending: Option<Declaration>,
    error: Option<Error>,
    reported: bool,
}

impl<T: TokenStream> Parser<T> {
    pub fn new(tokens: T) -> Self {
        Self::with_config(tokens, ParserConfig::default())
    }

    pub fn with_config(tokens: T, config: ParserConfig) -> Self {
        Self {
            tokens,
            config,
            state: State::Comments,
            comments: CommentGroup::new(),
            pending: None,
            error: None,
            reported: false,
        }
    }

    /// Produce the next declaration.
    ///
    /// The flag is `false` once the parser has terminated, either cleanly at the end of input
    /// or with an error available from [`Parser::error`]. The declaration is then
    /// [`Declaration::Bad`], and stays so for every subsequent call.
    pub fn next_declaration(&mut self) -> (Declaration, bool) {
        loop {
            if let Some(decl) = self.pending.take() {
                return (decl, true);
            }
            if matches!(self.state, State::Eof | State::Error) {
                return (Declaration::Bad, false);
            }
            let state = mem::replace(&mut self.state, State::Error);
            self.state = self.step(state);
        }
    }

    /// The error which terminated the parser, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    fn step(&mut self, state: State) -> State {
        match state {
            State::Comments => self.collect_comments(),
            State::Declaration => self.declaration(),
            State::Entry { type_name } => self.entry(type_name),
            State::Preamble => self.preamble(),
            State::Abbrev => self.abbrev(),
            State::Eof => State::Eof,
            State::Error => State::Error,
        }
    }

    fn fail(&mut self, error: Error) -> State {
        tracing::debug!(%error, "parser entered error state");
        self.error = Some(error);
        self.comments.clear();
        State::Error
    }

    fn fail_at(&mut self, code: SyntaxError, token: &Token) -> State {
        self.fail(Error::syntax(code, token.position))
    }

    fn unexpected(&mut self, expected: &'static str, token: &Token) -> State {
        self.fail_at(
            SyntaxError::UnexpectedToken {
                expected,
                found: token.kind,
            },
            token,
        )
    }

    /// Handle a terminal token seen in the middle of a declaration.
    fn interrupted(&mut self, token: &Token) -> State {
        match token.kind {
            TokenKind::Error => self.upstream(token),
            _ => self.fail_at(SyntaxError::UnexpectedEof, token),
        }
    }

    /// Take over the error reported by the token stream.
    fn upstream(&mut self, token: &Token) -> State {
        let error = self
            .tokens
            .error()
            .cloned()
            .unwrap_or(Error::syntax(SyntaxError::Upstream, token.position));
        self.fail(error)
    }

    fn push_comment(&mut self, token: Token) {
        if !self.config.discard_comments {
            self.comments.push(token.text);
        }
    }

    fn emit(&mut self, decl: Declaration) -> State {
        tracing::debug!(kind = decl.kind_name(), "declaration");
        self.pending = Some(decl);
        State::Comments
    }

    fn expect_left_delim(&mut self) -> std::result::Result<(), State> {
        let token = self.tokens.next_token();
        match token.kind {
            TokenKind::LeftDelim => Ok(()),
            kind if kind.is_terminal() => Err(self.interrupted(&token)),
            _ => Err(self.unexpected("an opening delimiter", &token)),
        }
    }

    /// Pair a field value with the field name preceding it.
    fn field(&mut self, key: Option<String>, token: Token) -> std::result::Result<FieldStmt, State> {
        match key {
            Some(key) if !key.is_empty() => {
                if token.text.is_empty() {
                    Err(self.fail_at(SyntaxError::EmptyFieldValue, &token))
                } else {
                    Ok(FieldStmt::new(key, token.text))
                }
            }
            _ => Err(self.fail_at(SyntaxError::EmptyFieldKey, &token)),
        }
    }

    fn collect_comments(&mut self) -> State {
        loop {
            let token = self.tokens.next_token();
            match token.kind {
                TokenKind::Comment => self.push_comment(token),
                TokenKind::EntryDelim => return State::Declaration,
                TokenKind::Eof => return State::Eof,
                TokenKind::Error => return self.upstream(&token),
                _ => return self.unexpected("a comment or '@'", &token),
            }
        }
    }

    fn declaration(&mut self) -> State {
        let token = self.tokens.next_token();
        match token.kind {
            TokenKind::EntryType => {
                let type_name = if self.config.lowercase_entry_types {
                    token.text.to_lowercase()
                } else {
                    token.text
                };
                State::Entry { type_name }
            }
            TokenKind::Abbrev => State::Abbrev,
            TokenKind::Preamble => State::Preamble,
            kind if kind.is_terminal() => self.interrupted(&token),
            _ => self.unexpected("an entry type", &token),
        }
    }

    fn entry(&mut self, type_name: String) -> State {
        if let Err(state) = self.expect_left_delim() {
            return state;
        }

        let token = self.tokens.next_token();
        let cite_key = match token.kind {
            TokenKind::CiteKey if !token.text.is_empty() => token.text,
            kind if kind.is_terminal() => return self.interrupted(&token),
            _ => return self.fail_at(SyntaxError::MissingCiteKey, &token),
        };

        let mut fields = Vec::new();
        let mut key = None;
        loop {
            let token = self.tokens.next_token();
            match token.kind {
                TokenKind::FieldType => key = Some(token.text),
                TokenKind::EqSign | TokenKind::Comma => {}
                TokenKind::Comment => self.push_comment(token),
                TokenKind::FieldText => match self.field(key.take(), token) {
                    Ok(field) => fields.push(field),
                    Err(state) => return state,
                },
                TokenKind::RightDelim => break,
                kind if kind.is_terminal() => return self.interrupted(&token),
                _ => return self.unexpected("a field or a closing delimiter", &token),
            }
        }

        let comments = mem::take(&mut self.comments);
        self.emit(Declaration::Entry(EntryDecl {
            type_name,
            cite_key,
            comments,
            fields,
        }))
    }

    fn preamble(&mut self) -> State {
        if let Err(state) = self.expect_left_delim() {
            return state;
        }

        let mut value = None;
        loop {
            let token = self.tokens.next_token();
            match token.kind {
                TokenKind::Comment => self.push_comment(token),
                TokenKind::FieldText if value.is_none() => {
                    if token.text.is_empty() {
                        return self.fail_at(SyntaxError::EmptyFieldValue, &token);
                    }
                    value = Some(token.text);
                }
                TokenKind::RightDelim => match value {
                    Some(value) => {
                        let comments = mem::take(&mut self.comments);
                        return self.emit(Declaration::Preamble(PreambleDecl { comments, value }));
                    }
                    None => {
                        return self
                            .fail_at(SyntaxError::IncompleteDeclaration("preamble"), &token);
                    }
                },
                kind if kind.is_terminal() => return self.interrupted(&token),
                _ if value.is_none() => return self.unexpected("a value", &token),
                _ => return self.unexpected("a closing delimiter", &token),
            }
        }
    }

    fn abbrev(&mut self) -> State {
        if let Err(state) = self.expect_left_delim() {
            return state;
        }

        let mut field = None;
        let mut key = None;
        loop {
            let token = self.tokens.next_token();
            match token.kind {
                TokenKind::Comment => self.push_comment(token),
                TokenKind::FieldType if field.is_none() => key = Some(token.text),
                TokenKind::EqSign if field.is_none() => {}
                TokenKind::FieldText if field.is_none() => match self.field(key.take(), token) {
                    Ok(stmt) => field = Some(stmt),
                    Err(state) => return state,
                },
                TokenKind::RightDelim => match field {
                    Some(field) => {
                        let comments = mem::take(&mut self.comments);
                        return self.emit(Declaration::Abbrev(AbbrevDecl { comments, field }));
                    }
                    None => {
                        return self.fail_at(SyntaxError::IncompleteDeclaration("string"), &token);
                    }
                },
                kind if kind.is_terminal() => return self.interrupted(&token),
                _ if field.is_none() => return self.unexpected("a field", &token),
                _ => return self.unexpected("a closing delimiter", &token),
            }
        }
    }
}

impl<'r> Parser<Scanner<StrSource<'r>>> {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &'r str) -> Self {
        Self::new(Scanner::from_str(input))
    }
}

impl<R: Read> Parser<Scanner<IoSource<R>>> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(Scanner::from_reader(reader))
    }
}

/// Yields every declaration, followed by the terminating error if there is one.
impl<T: TokenStream> Iterator for Parser<T> {
    type Item = Result<Declaration>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_declaration() {
            (decl, true) => Some(Ok(decl)),
            (_, false) if self.reported => None,
            (_, false) => {
                self.reported = true;
                self.error.clone().map(Err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexicalError;
    use crate::token::Position;

    /// A token stream over a fixed list of tokens, ending with `Eof`.
    struct Tokens(std::vec::IntoIter<Token>);

    impl Tokens {
        fn new(kinds: &[(TokenKind, &str)]) -> Self {
            let tokens: Vec<Token> = kinds
                .iter()
                .enumerate()
                .map(|(i, (kind, text))| Token::new(*kind, *text, Position::new(1, i + 1)))
                .collect();
            Self(tokens.into_iter())
        }
    }

    impl TokenStream for Tokens {
        fn next_token(&mut self) -> Token {
            self.0
                .next()
                .unwrap_or(Token::new(TokenKind::Eof, "", Position::default()))
        }
    }

    fn parse(input: &str) -> Result<Vec<Declaration>> {
        Parser::from_str(input).collect()
    }

    fn entry(type_name: &str, cite_key: &str, comments: &[&str], fields: &[(&str, &str)]) -> Declaration {
        Declaration::Entry(EntryDecl {
            type_name: type_name.into(),
            cite_key: cite_key.into(),
            comments: comments.iter().copied().collect(),
            fields: fields
                .iter()
                .map(|(key, value)| FieldStmt::new(*key, *value))
                .collect(),
        })
    }

    fn syntax_error(kinds: &[(TokenKind, &str)]) -> SyntaxError {
        let mut parser = Parser::new(Tokens::new(kinds));
        match parser.find_map(|res| res.err()) {
            Some(Error::Syntax { code, .. }) => code,
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_book() {
        let input = r#"
@book{hicks2001,
	author    = "von Hicks, III, Michael",
	title     = "Design of a Carbon Fiber Composite Grid Structure for the GLAST
	Spacecraft Using a Novel Manufacturing Technique",
	publisher = "Stanford Press",
	year      =  2001,
	address   = "Palo Alto",
	edition   = "1st,",
	isbn      = "0-69-697269-4"
}
"#;
        assert_eq!(
            parse(input),
            Ok(vec![entry(
                "book",
                "hicks2001",
                &[],
                &[
                    ("author", r#""von Hicks, III, Michael""#),
                    (
                        "title",
                        "\"Design of a Carbon Fiber Composite Grid Structure for the GLAST\n\tSpacecraft Using a Novel Manufacturing Technique\""
                    ),
                    ("publisher", r#""Stanford Press""#),
                    ("year", "2001"),
                    ("address", r#""Palo Alto""#),
                    ("edition", r#""1st,""#),
                    ("isbn", r#""0-69-697269-4""#),
                ],
            )])
        );
    }

    #[test]
    fn test_comments_attach_in_order() {
        let input = "
% before
@misc{key,
    % inside
    year = 2000, % after a field
}
trailing
";
        assert_eq!(
            parse(input),
            Ok(vec![entry(
                "misc",
                "key",
                &["% before", "inside", "after a field"],
                &[("year", "2000")],
            )])
        );
    }

    #[test]
    fn test_comments_reset_between_declarations() {
        let decls = parse("one @misc{a} two @misc{b}").unwrap_or_default();
        assert_eq!(decls.len(), 2);
        assert_eq!(
            decls[0].comments().map(|c| c.iter().cloned().collect::<Vec<_>>()),
            Some(vec!["one".to_string()])
        );
        assert_eq!(
            decls[1].comments().map(|c| c.iter().cloned().collect::<Vec<_>>()),
            Some(vec!["two".to_string()])
        );
    }

    #[test]
    fn test_abbrev_and_preamble() {
        assert_eq!(
            parse(r#"@string{btx = "{\textsc{Bib}\TeX}" }"#),
            Ok(vec![Declaration::Abbrev(AbbrevDecl {
                comments: CommentGroup::new(),
                field: FieldStmt::new("btx", r#""{\textsc{Bib}\TeX}""#),
            })])
        );
        assert_eq!(
            parse(r#"@string{x = "Y"}"#),
            Ok(vec![Declaration::Abbrev(AbbrevDecl {
                comments: CommentGroup::new(),
                field: FieldStmt::new("x", r#""Y""#),
            })])
        );
        assert_eq!(
            parse(r#"@PREAMBLE{"\makeatletter"}"#),
            Ok(vec![Declaration::Preamble(PreambleDecl {
                comments: CommentGroup::new(),
                value: r#""\makeatletter""#.into(),
            })])
        );
    }

    #[test]
    fn test_fields_verbatim() {
        assert_eq!(
            parse("@book{b1, author = {A. Author}, year = 1999}"),
            Ok(vec![entry(
                "book",
                "b1",
                &[],
                &[("author", "{A. Author}"), ("year", "1999")],
            )])
        );
        assert_eq!(
            parse(r#"@Book(b1, title = {The {Death} of an "Author"})"#),
            Ok(vec![entry(
                "Book",
                "b1",
                &[],
                &[("title", r#"{The {Death} of an "Author"}"#)],
            )])
        );
        assert_eq!(
            parse("@misc{key}"),
            Ok(vec![entry("misc", "key", &[], &[])])
        );
    }

    #[test]
    fn test_lexical_errors_pass_through() {
        let mut parser = Parser::from_str("@misc{a} @book(b1, year = 1999}");
        assert_eq!(
            parser.next(),
            Some(Ok(entry("misc", "a", &[], &[])))
        );
        assert!(matches!(
            parser.next(),
            Some(Err(Error::Lexical {
                code: LexicalError::MismatchedDelimiter { .. },
                ..
            }))
        ));
        assert_eq!(parser.next(), None);
        assert_eq!(parser.next(), None);
        assert_eq!(parser.next_declaration(), (Declaration::Bad, false));
        assert!(parser.error().is_some());
    }

    #[test]
    fn test_unterminated_entry() {
        let mut parser = Parser::from_str("@book(b1, title = {T}");
        assert_eq!(parser.next_declaration(), (Declaration::Bad, false));
        assert!(matches!(
            parser.error(),
            Some(Error::Lexical {
                code: LexicalError::UnexpectedEof,
                ..
            })
        ));
    }

    #[test]
    fn test_clean_end() {
        let mut parser = Parser::from_str("% nothing here\n");
        assert_eq!(parser.next(), None);
        assert_eq!(parser.error(), None);
        assert_eq!(parser.next_declaration(), (Declaration::Bad, false));
        assert_eq!(parse(""), Ok(vec![]));
    }

    #[test]
    fn test_syntax_errors() {
        use TokenKind::*;

        assert_eq!(
            syntax_error(&[(EntryDelim, "@"), (EntryType, "book"), (LeftDelim, "{"), (Comma, ",")]),
            SyntaxError::MissingCiteKey
        );
        assert_eq!(
            syntax_error(&[(EntryDelim, "@"), (EntryType, "book"), (LeftDelim, "{"), (CiteKey, "")]),
            SyntaxError::MissingCiteKey
        );
        assert_eq!(
            syntax_error(&[
                (EntryDelim, "@"),
                (EntryType, "book"),
                (LeftDelim, "{"),
                (CiteKey, "b"),
                (Comma, ","),
                (EqSign, "="),
                (FieldText, "1"),
            ]),
            SyntaxError::EmptyFieldKey
        );
        assert_eq!(
            syntax_error(&[
                (EntryDelim, "@"),
                (EntryType, "book"),
                (LeftDelim, "{"),
                (CiteKey, "b"),
                (Comma, ","),
                (FieldType, "year"),
                (EqSign, "="),
                (FieldText, ""),
            ]),
            SyntaxError::EmptyFieldValue
        );
        assert_eq!(
            syntax_error(&[(CiteKey, "b")]),
            SyntaxError::UnexpectedToken {
                expected: "a comment or '@'",
                found: CiteKey
            }
        );
        assert_eq!(
            syntax_error(&[(EntryDelim, "@"), (FieldText, "1")]),
            SyntaxError::UnexpectedToken {
                expected: "an entry type",
                found: FieldText
            }
        );
        assert_eq!(
            syntax_error(&[(EntryDelim, "@"), (Abbrev, "string"), (LeftDelim, "{"), (RightDelim, "}")]),
            SyntaxError::IncompleteDeclaration("string")
        );
        assert_eq!(
            syntax_error(&[(EntryDelim, "@"), (Preamble, "preamble"), (LeftDelim, "("), (RightDelim, ")")]),
            SyntaxError::IncompleteDeclaration("preamble")
        );
        assert_eq!(
            syntax_error(&[
                (EntryDelim, "@"),
                (Preamble, "preamble"),
                (LeftDelim, "{"),
                (FieldText, "\"a\""),
                (FieldText, "\"b\""),
            ]),
            SyntaxError::UnexpectedToken {
                expected: "a closing delimiter",
                found: FieldText
            }
        );
        assert_eq!(
            syntax_error(&[(EntryDelim, "@"), (EntryType, "book"), (LeftDelim, "{"), (CiteKey, "b")]),
            SyntaxError::UnexpectedEof
        );
    }

    #[test]
    fn test_upstream_error_without_cause() {
        let mut parser = Parser::new(Tokens::new(&[
            (TokenKind::Comment, "a"),
            (TokenKind::Error, ""),
        ]));
        assert_eq!(
            parser.next(),
            Some(Err(Error::syntax(SyntaxError::Upstream, Position::new(1, 2))))
        );
        assert_eq!(parser.next(), None);
    }

    #[test]
    fn test_config() {
        let input = "% lead\n@Article{a, % note\n title = {T}}";
        let config = ParserConfig {
            lowercase_entry_types: true,
            discard_comments: true,
        };
        let decls: Result<Vec<_>> = Parser::with_config(Scanner::from_str(input), config).collect();
        assert_eq!(decls, Ok(vec![entry("article", "a", &[], &[("title", "{T}")])]));

        let decls = parse(input);
        assert_eq!(
            decls,
            Ok(vec![entry("Article", "a", &["% lead", "note"], &[("title", "{T}")])])
        );
    }

    #[test]
    fn test_rerun_is_identical() {
        let input = "@string{a = {b}} @misc{k, note = \"x\"} @preamble{{p}}";
        assert_eq!(parse(input), parse(input));
        assert_eq!(parse(input).map(|decls| decls.len()), Ok(3));
    }

    #[test]
    fn test_from_reader() {
        let input = "@misc{k, note = {ü}}";
        let decls: Result<Vec<_>> = Parser::from_reader(input.as_bytes()).collect();
        assert_eq!(decls, parse(input));
    }

    use proptest::prelude::*;
    proptest! {
        #[test]
        fn no_panic(s in "\\PC*") {
            let mut parser = Parser::from_str(&s);
            for _ in parser.by_ref() {}
            prop_assert_eq!(parser.next_declaration(), (Declaration::Bad, false));
        }
    }
}
