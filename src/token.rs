//! # Lexical components of a BibTeX document.
//!
//! The [`Scanner`](crate::Scanner) emits a stream of [`Token`]s, each carrying a [`TokenKind`],
//! the text as scanned and the [`Position`] at which it began. Any producer of tokens can drive
//! the [`Parser`](crate::Parser) by implementing [`TokenStream`].
//!
//! The validation methods decide which strings are permitted as the various token kinds:
//!
//! | Token kind                                       | Rule                                |
//! |--------------------------------------------------|-------------------------------------|
//! | [`EntryType`](TokenKind::EntryType), [`CiteKey`](TokenKind::CiteKey), [`FieldType`](TokenKind::FieldType) | [`check_name`] |
//! | [`FieldText`](TokenKind::FieldText)              | [`check_field_text`]                |
mod error;
mod types;
mod validate;

pub use error::*;
pub use types::*;
pub use validate::*;
