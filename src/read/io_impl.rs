//! Implementation of `IoSource`, decoding UTF-8 incrementally from any [`std::io::Read`].
use std::io::{self, BufReader, Read};

use super::RuneSource;
use crate::error::ReadError;

/// A [`RuneSource`] over a byte stream, such as a file or standard input.
#[derive(Debug)]
pub struct IoSource<R> {
    reader: BufReader<R>,
    last: Option<char>,
    pushed_back: bool,
}

impl<R: Read> IoSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            last: None,
            pushed_back: false,
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, ReadError> {
        let mut byte = [0u8];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn decode(&mut self) -> Result<Option<char>, ReadError> {
        let first = match self.read_byte()? {
            Some(byte) => byte,
            None => return Ok(None),
        };

        let width = utf8_width(first).ok_or(ReadError::InvalidUtf8)?;
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            *slot = self.read_byte()?.ok_or(ReadError::InvalidUtf8)?;
        }

        std::str::from_utf8(&buf[..width])
            .map_err(|_| ReadError::InvalidUtf8)
            .map(|s| s.chars().next())
    }
}

/// The number of bytes in a UTF-8 sequence starting with `first`.
fn utf8_width(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl<R: Read> RuneSource for IoSource<R> {
    fn next_char(&mut self) -> Result<Option<char>, ReadError> {
        if self.pushed_back {
            self.pushed_back = false;
            return Ok(self.last);
        }

        let next = self.decode();
        self.last = match next {
            Ok(ch) => ch,
            Err(_) => None,
        };
        next
    }

    fn pushback(&mut self) -> Result<(), ReadError> {
        if self.pushed_back || self.last.is_none() {
            return Err(ReadError::Pushback);
        }
        self.pushed_back = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        let mut source = IoSource::new("a🍄ü\n".as_bytes());
        assert_eq!(source.next_char(), Ok(Some('a')));
        assert_eq!(source.next_char(), Ok(Some('🍄')));
        assert_eq!(source.pushback(), Ok(()));
        assert_eq!(source.pushback(), Err(ReadError::Pushback));
        assert_eq!(source.next_char(), Ok(Some('🍄')));
        assert_eq!(source.next_char(), Ok(Some('ü')));
        assert_eq!(source.next_char(), Ok(Some('\n')));
        assert_eq!(source.next_char(), Ok(None));
        assert_eq!(source.pushback(), Err(ReadError::Pushback));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut source = IoSource::new(&b"a\xff"[..]);
        assert_eq!(source.next_char(), Ok(Some('a')));
        assert_eq!(source.next_char(), Err(ReadError::InvalidUtf8));

        // truncated multi-byte sequence
        let mut source = IoSource::new(&b"\xf0\x9f"[..]);
        assert_eq!(source.next_char(), Err(ReadError::InvalidUtf8));

        // overlong encoding passes the width check but fails decoding
        let mut source = IoSource::new(&b"\xe0\x80\x80"[..]);
        assert_eq!(source.next_char(), Err(ReadError::InvalidUtf8));
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_io_error() {
        let mut source = IoSource::new(Failing);
        assert_eq!(
            source.next_char(),
            Err(ReadError::Io {
                kind: io::ErrorKind::PermissionDenied,
                message: "denied".to_string()
            })
        );
    }
}
