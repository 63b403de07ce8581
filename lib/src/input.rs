/*! Input sources.

Matching consumes input one code point at a time and never backs up, so a
pattern can be run against data that isn't in memory all at once. A
[`Source`] hands over the input as a sequence of chunks; the executor pulls
the next chunk only after exhausting the previous one, keeping a single
chunk alive at any time.

Two implementations are provided: `&str`, which hands itself over as one
chunk, and [`Reader`], which adapts any [`std::io::Read`] and validates the
bytes as UTF-8 chunk by chunk.
*/

use std::io::Read;

use crate::errors::MatchError;

/// A producer of input chunks for the matcher.
pub trait Source {
    /// Pulls the next chunk of input. Returns `None` once the input is
    /// exhausted; after that every call must keep returning `None`.
    fn pull(&mut self) -> Result<Option<String>, MatchError>;
}

impl Source for &str {
    fn pull(&mut self) -> Result<Option<String>, MatchError> {
        if self.is_empty() {
            Ok(None)
        } else {
            let chunk = self.to_string();
            *self = "";
            Ok(Some(chunk))
        }
    }
}

const CHUNK_SIZE: usize = 8192;

/// A [`Source`] that reads UTF-8 text from a [`std::io::Read`].
///
/// Code points split across read boundaries are carried over into the next
/// chunk, so any chunking of a valid UTF-8 stream is accepted.
pub struct Reader<R: Read> {
    inner: R,
    /// Trailing bytes of the previous read that didn't form a complete
    /// code point yet.
    carry: Vec<u8>,
}

impl<R: Read> Reader<R> {
    /// Wraps `inner` in a chunked UTF-8 source.
    pub fn new(inner: R) -> Self {
        Self { inner, carry: Vec::new() }
    }
}

impl<R: Read> Source for Reader<R> {
    fn pull(&mut self) -> Result<Option<String>, MatchError> {
        loop {
            let mut buf = Vec::with_capacity(CHUNK_SIZE + 4);
            buf.append(&mut self.carry);
            let carried = buf.len();
            buf.resize(carried + CHUNK_SIZE, 0);
            let n = self.inner.read(&mut buf[carried..])?;
            buf.truncate(carried + n);
            if n == 0 {
                // An incomplete code point can't be finished anymore.
                if !buf.is_empty() {
                    return Err(MatchError::InvalidUtf8);
                }
                return Ok(None);
            }
            match String::from_utf8(buf) {
                Ok(chunk) => return Ok(Some(chunk)),
                Err(err) if err.utf8_error().error_len().is_none() => {
                    // The chunk ends in the middle of a code point; stash
                    // the partial tail for the next pull.
                    let valid = err.utf8_error().valid_up_to();
                    let mut buf = err.into_bytes();
                    self.carry = buf.split_off(valid);
                    if valid == 0 {
                        continue;
                    }
                    let chunk = String::from_utf8(buf)
                        .map_err(|_| MatchError::InvalidUtf8)?;
                    return Ok(Some(chunk));
                }
                Err(_) => return Err(MatchError::InvalidUtf8),
            }
        }
    }
}

/// A window over a [`Source`], exposing the input one code point at a
/// time.
pub(crate) struct Cursor<S: Source> {
    source: S,
    chunk: String,
    at: usize,
    exhausted: bool,
}

impl<S: Source> Cursor<S> {
    pub fn new(source: S) -> Self {
        Self { source, chunk: String::new(), at: 0, exhausted: false }
    }

    /// Ensures at least one unconsumed code point is buffered. Returns
    /// false once the source is exhausted.
    pub fn more_input(&mut self) -> Result<bool, MatchError> {
        loop {
            if self.at < self.chunk.len() {
                return Ok(true);
            }
            if self.exhausted {
                return Ok(false);
            }
            match self.source.pull()? {
                Some(chunk) => {
                    self.chunk = chunk;
                    self.at = 0;
                }
                None => self.exhausted = true,
            }
        }
    }

    /// The next code point, without consuming it. `None` at the end of the
    /// input.
    pub fn peek(&mut self) -> Result<Option<char>, MatchError> {
        if self.more_input()? {
            Ok(self.chunk[self.at..].chars().next())
        } else {
            Ok(None)
        }
    }

    /// Consumes and returns the next code point. Must only be called after
    /// [`Cursor::more_input`] returned true.
    pub fn eat(&mut self) -> char {
        match self.chunk[self.at..].chars().next() {
            Some(c) => {
                self.at += c.len_utf8();
                c
            }
            None => unreachable!("eat called with no input buffered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use pretty_assertions::assert_eq;

    use super::{Cursor, Reader, Source};
    use crate::errors::MatchError;

    fn drain<S: Source>(source: S) -> Result<String, MatchError> {
        let mut cursor = Cursor::new(source);
        let mut out = String::new();
        while cursor.more_input()? {
            out.push(cursor.eat());
        }
        Ok(out)
    }

    #[test]
    fn str_source() {
        assert_eq!(drain("hëllo").unwrap(), "hëllo");
        assert_eq!(drain("").unwrap(), "");
    }

    #[test]
    fn reader_source() {
        let reader = Reader::new(io::Cursor::new("snowman: ☃".as_bytes()));
        assert_eq!(drain(reader).unwrap(), "snowman: ☃");
    }

    /// Reads one byte at a time, forcing code points to split across
    /// chunks.
    struct OneByte<'a>(&'a [u8]);

    impl io::Read for OneByte<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            // Leave room for carried bytes; take one fresh byte per call.
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn split_code_points_are_carried_over() {
        let reader = Reader::new(OneByte("☃x☃".as_bytes()));
        assert_eq!(drain(reader).unwrap(), "☃x☃");
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let reader = Reader::new(io::Cursor::new(&b"ab\xff"[..]));
        assert!(matches!(drain(reader), Err(MatchError::InvalidUtf8)));
    }

    #[test]
    fn truncated_code_point_at_eof() {
        let reader = Reader::new(io::Cursor::new(&"☃".as_bytes()[..2]));
        assert!(matches!(drain(reader), Err(MatchError::InvalidUtf8)));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut cursor = Cursor::new("ab");
        assert_eq!(cursor.peek().unwrap(), Some('a'));
        assert_eq!(cursor.eat(), 'a');
        assert_eq!(cursor.peek().unwrap(), Some('b'));
        assert_eq!(cursor.eat(), 'b');
        assert_eq!(cursor.peek().unwrap(), None);
    }
}
