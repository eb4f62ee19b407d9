//! Implementation of `StrSource`, reading chars directly out of a string slice.
use super::RuneSource;
use crate::error::ReadError;

/// A [`RuneSource`] over a borrowed string.
#[derive(Debug, Clone)]
pub struct StrSource<'r> {
    input: &'r str,
    pos: usize,
    /// Width in bytes of the last char read, if it can be pushed back.
    last: Option<usize>,
}

impl<'r> StrSource<'r> {
    pub fn new(input: &'r str) -> Self {
        Self {
            input,
            pos: 0,
            last: None,
        }
    }

    /// The unread part of the input.
    pub fn remaining(&self) -> &'r str {
        &self.input[self.pos..]
    }
}

impl RuneSource for StrSource<'_> {
    fn next_char(&mut self) -> Result<Option<char>, ReadError> {
        match self.remaining().chars().next() {
            Some(ch) => {
                let width = ch.len_utf8();
                self.pos += width;
                self.last = Some(width);
                Ok(Some(ch))
            }
            None => {
                self.last = None;
                Ok(None)
            }
        }
    }

    fn pushback(&mut self) -> Result<(), ReadError> {
        let width = self.last.take().ok_or(ReadError::Pushback)?;
        self.pos -= width;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_char() {
        let mut source = StrSource::new("a🍄b");
        assert_eq!(source.next_char(), Ok(Some('a')));
        assert_eq!(source.next_char(), Ok(Some('🍄')));
        assert_eq!(source.remaining(), "b");
        assert_eq!(source.pushback(), Ok(()));
        assert_eq!(source.remaining(), "🍄b");
        assert_eq!(source.next_char(), Ok(Some('🍄')));
        assert_eq!(source.next_char(), Ok(Some('b')));
        assert_eq!(source.next_char(), Ok(None));
        assert_eq!(source.next_char(), Ok(None));
    }

    #[test]
    fn test_pushback() {
        let mut source = StrSource::new("xy");
        assert_eq!(source.pushback(), Err(ReadError::Pushback));
        assert_eq!(source.next_char(), Ok(Some('x')));
        assert_eq!(source.pushback(), Ok(()));
        assert_eq!(source.pushback(), Err(ReadError::Pushback));

        // nothing to undo after the end of input
        let mut source = StrSource::new("");
        assert_eq!(source.next_char(), Ok(None));
        assert_eq!(source.pushback(), Err(ReadError::Pushback));
    }
}
