//! # Validation methods
//! This module exposes some methods to aid validation of BibTeX-type strings.
use super::TokenError;

/// Punctuation permitted in a NAME in addition to letters and digits.
pub const NAME_PUNCTUATION: &str = "_-/!?$&*+.:;<>[]^`|";

/// Check if a char may appear in a NAME.
#[inline]
pub fn is_name_char(ch: char) -> bool {
    ch.is_alphabetic() || ch.is_numeric() || NAME_PUNCTUATION.contains(ch)
}

/// Check that a string is a NAME, as used for entry types, cite keys and field names.
pub fn check_name(s: &str) -> Result<(), TokenError> {
    if s.is_empty() {
        Err(TokenError::Empty)
    } else {
        s.chars()
            .find(|ch| !is_name_char(*ch))
            .map_or(Ok(()), |ch| Err(TokenError::InvalidChar(ch)))
    }
}

/// Check if a given string is valid as a NAME.
#[inline]
pub fn is_name(s: &str) -> bool {
    check_name(s).is_ok()
}

/// Check if a given string is a bare run of ASCII digits.
#[inline]
pub fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Check that a string is enclosed in a quote pair or a bracket pair, with balanced brackets
/// and quotes inside. A backslash escapes the char which follows it.
pub fn check_delimited(s: &str) -> Result<(), TokenError> {
    if s.is_empty() {
        return Err(TokenError::Empty);
    }

    let quoted = s.len() >= 2 && s.starts_with('"') && s.ends_with('"');
    let curly = s.starts_with('{') && s.ends_with('}');
    if !quoted && !curly {
        return Err(TokenError::Undelimited);
    }

    let mut bracket_depth = 0usize;
    let mut quotes = 0usize;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '{' => bracket_depth += 1,
            '}' => {
                // too many closing brackets
                if bracket_depth == 0 {
                    return Err(TokenError::ExtraClosingBracket);
                }
                bracket_depth -= 1;
            }
            '"' => quotes += 1,
            _ => {}
        }
    }

    if bracket_depth != 0 {
        Err(TokenError::ExtraOpeningBracket)
    } else if quotes % 2 != 0 {
        Err(TokenError::UnbalancedQuotes)
    } else {
        Ok(())
    }
}

/// Check that a string is valid field text: a number, or properly delimited.
pub fn check_field_text(s: &str) -> Result<(), TokenError> {
    if is_number(s) {
        Ok(())
    } else {
        check_delimited(s)
    }
}

/// Check if a given string is valid as field text.
#[inline]
pub fn is_field_text(s: &str) -> bool {
    check_field_text(s).is_ok()
}
