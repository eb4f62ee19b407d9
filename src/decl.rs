//! # Declarations
//!
//! The [`Parser`](crate::Parser) assembles tokens into [`Declaration`]s. Field values are kept
//! exactly as scanned, including their outer delimiters, and abbreviations are never expanded.
//!
//! | Declaration                  | Source                              |
//! |------------------------------|-------------------------------------|
//! | [`Declaration::Entry`]       | `@article{key, title = {Title}}`    |
//! | [`Declaration::Abbrev`]      | `@string{key = {Value}}`            |
//! | [`Declaration::Preamble`]    | `@preamble{"\makeatletter"}`        |
use serde::Serialize;
use unicase::UniCase;

/// A single `key = value` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldStmt {
    pub key: String,
    /// The value with its delimiters retained, such as `{Title}`, `"Title"` or `1999`.
    pub value: String,
}

impl FieldStmt {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Comments in the order in which they were encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommentGroup(Vec<String>);

impl CommentGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, comment: impl Into<String>) {
        self.0.push(comment.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<S: Into<String>> FromIterator<S> for CommentGroup {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a CommentGroup {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A regular entry, such as `@article{key, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryDecl {
    pub type_name: String,
    pub cite_key: String,
    pub comments: CommentGroup,
    pub fields: Vec<FieldStmt>,
}

impl EntryDecl {
    /// The value of the first field named `key`, ignoring case.
    pub fn field(&self, key: &str) -> Option<&str> {
        let key = UniCase::new(key);
        self.fields
            .iter()
            .find(|field| UniCase::new(field.key.as_str()) == key)
            .map(|field| field.value.as_str())
    }
}

/// A string abbreviation, such as `@string{key = {Value}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AbbrevDecl {
    pub comments: CommentGroup,
    pub field: FieldStmt,
}

/// A preamble, such as `@preamble{"\makeatletter"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreambleDecl {
    pub comments: CommentGroup,
    pub value: String,
}

/// A top-level BibTeX declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Entry(EntryDecl),
    Abbrev(AbbrevDecl),
    Preamble(PreambleDecl),
    /// Returned once the parser has terminated.
    Bad,
}

impl Declaration {
    /// The comments attached to the declaration.
    pub fn comments(&self) -> Option<&CommentGroup> {
        match self {
            Self::Entry(entry) => Some(&entry.comments),
            Self::Abbrev(abbrev) => Some(&abbrev.comments),
            Self::Preamble(preamble) => Some(&preamble.comments),
            Self::Bad => None,
        }
    }

    /// A short name for the kind of declaration.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Entry(_) => "entry",
            Self::Abbrev(_) => "string",
            Self::Preamble(_) => "preamble",
            Self::Bad => "bad",
        }
    }

    #[inline]
    pub fn is_bad(&self) -> bool {
        matches!(self, Self::Bad)
    }
}
