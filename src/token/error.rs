use std::error::Error;
use std::fmt;

/// Possible syntax errors in BibTeX names and field text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Expected to be non-empty.
    Empty,
    /// Contains an invalid char.
    InvalidChar(char),
    /// Has an extra closing bracket.
    ExtraClosingBracket,
    /// Has too many opening brackets.
    ExtraOpeningBracket,
    /// Has an odd number of unescaped quotes.
    UnbalancedQuotes,
    /// Neither a number nor enclosed in quotes or brackets.
    Undelimited,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Empty => f.write_str("must be non-empty"),
            TokenError::InvalidChar(ch) => write!(f, "contains invalid character '{ch}'"),
            TokenError::ExtraClosingBracket => f.write_str("has extra closing bracket"),
            TokenError::ExtraOpeningBracket => f.write_str("has unclosed opening bracket"),
            TokenError::UnbalancedQuotes => f.write_str("has unbalanced quotes"),
            TokenError::Undelimited => {
                f.write_str("must be a number or enclosed in quotes or brackets")
            }
        }
    }
}

impl Error for TokenError {}
