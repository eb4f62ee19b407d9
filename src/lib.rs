//! # bibstream
//!
//! An incremental scanner and parser for BibTeX source text.
//!
//! Parsing happens in two pull-based stages. The [`Scanner`] turns chars into [`Token`]s, and
//! the [`Parser`] turns tokens into [`Declaration`]s. Neither stage reads further ahead than it
//! needs to, so a large bibliography can be processed one declaration at a time.
//!
//! ```
//! use bibstream::{Declaration, Parser};
//!
//! let input = "@book{b1, author = {A. Author}, year = 1999}";
//! for decl in Parser::from_str(input) {
//!     if let Declaration::Entry(entry) = decl.unwrap() {
//!         assert_eq!(entry.cite_key, "b1");
//!         assert_eq!(entry.field("author"), Some("{A. Author}"));
//!     }
//! }
//! ```
//!
//! Field values are kept verbatim, including their outer delimiters. String abbreviations are
//! reported as [`Declaration::Abbrev`] but never expanded.
//!
//! Both stages stop at the first malformed construct. There is no attempt to resume at the
//! next `@`.

/// Declarations assembled by the parser.
pub mod decl;

/// Error types for scanning and parsing.
pub mod error;

/// Token state machine.
pub mod parse;

/// Character sources.
pub mod read;

/// Char state machine.
pub mod scan;

/// Tokens and their validation.
pub mod token;

// re-exports
pub use decl::{AbbrevDecl, CommentGroup, Declaration, EntryDecl, FieldStmt, PreambleDecl};
pub use error::{Error, Result};
pub use parse::{Parser, ParserConfig};
pub use read::{IoSource, RuneSource, StrSource};
pub use scan::Scanner;
pub use token::{Position, Token, TokenKind, TokenStream};

/// Parse every declaration in `input`.
pub fn parse_str(input: &str) -> Result<Vec<Declaration>> {
    Parser::from_str(input).collect()
}
