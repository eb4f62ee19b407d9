//! Character sources consumed by the [`Scanner`](crate::Scanner).
mod io_impl;
mod str_impl;

pub use io_impl::IoSource;
pub use str_impl::StrSource;

use crate::error::ReadError;
use crate::token::Position;

/// A pull-based source of chars with a single level of pushback.
pub trait RuneSource {
    /// Read the next char, returning `None` at the end of input.
    fn next_char(&mut self) -> Result<Option<char>, ReadError>;

    /// Undo exactly one prior successful call to [`next_char`](RuneSource::next_char).
    ///
    /// Calling this twice without an intervening read fails with [`ReadError::Pushback`].
    fn pushback(&mut self) -> Result<(), ReadError>;
}

impl<R: RuneSource + ?Sized> RuneSource for &mut R {
    fn next_char(&mut self) -> Result<Option<char>, ReadError> {
        (**self).next_char()
    }

    fn pushback(&mut self) -> Result<(), ReadError> {
        (**self).pushback()
    }
}

/// Wraps a [`RuneSource`] and keeps track of the position of the chars which were read.
#[derive(Debug)]
pub(crate) struct Tracked<R> {
    source: R,
    /// Position of the next char to be read.
    next: Position,
    /// Position of the last char read.
    last: Position,
    /// State to restore on pushback.
    undo: Option<(Position, Position)>,
}

impl<R: RuneSource> Tracked<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            next: Position::default(),
            last: Position::default(),
            undo: None,
        }
    }

    pub fn next_char(&mut self) -> Result<Option<char>, ReadError> {
        let next = self.source.next_char()?;
        if let Some(ch) = next {
            self.undo = Some((self.next, self.last));
            self.last = self.next;
            self.next.advance(ch);
        }
        Ok(next)
    }

    pub fn pushback(&mut self) -> Result<(), ReadError> {
        self.source.pushback()?;
        if let Some((next, last)) = self.undo.take() {
            self.next = next;
            self.last = last;
        }
        Ok(())
    }

    /// The position of the most recently read char.
    #[inline]
    pub fn mark(&self) -> Position {
        self.last
    }
}
