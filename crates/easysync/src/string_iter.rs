//! Cursor over a string slice that counts in UTF-16 code units.
//!
//! Every length on the wire (`oldLen`, op chars, bank lengths) is a count of
//! UTF-16 code units, so a char outside the Basic Multilingual Plane counts
//! as two. A cut can never fall between the two halves of such a char.

use crate::error::PreconditionError;

/// Length of `s` in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Byte offset of UTF-16 unit `n` of `s`.
pub(crate) fn unit_offset(s: &str, n: usize) -> Result<usize, PreconditionError> {
    let mut units = 0;
    for (i, c) in s.char_indices() {
        if units == n {
            return Ok(i);
        }
        units += c.len_utf16();
        if units > n {
            return Err(PreconditionError::SplitsSurrogatePair { at: n });
        }
    }
    if units == n {
        Ok(s.len())
    } else {
        Err(PreconditionError::NotEnoughChars {
            wanted: n,
            remaining: units,
        })
    }
}

/// `s` split after its first `n` UTF-16 units.
pub(crate) fn split_at_unit(s: &str, n: usize) -> Result<(&str, &str), PreconditionError> {
    unit_offset(s, n).map(|at| s.split_at(at))
}

/// Walks a string as ops consume a char bank or document text.
#[derive(Debug, Clone)]
pub struct StringIter<'a> {
    s: &'a str,
    pos: usize,
    remaining: usize,
}

impl<'a> StringIter<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            s,
            pos: 0,
            remaining: utf16_len(s),
        }
    }

    /// Units not yet consumed.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// The unconsumed tail.
    pub fn rest(&self) -> &'a str {
        &self.s[self.pos..]
    }

    fn span(&self, n: usize) -> Result<usize, PreconditionError> {
        if n > self.remaining {
            return Err(PreconditionError::NotEnoughChars {
                wanted: n,
                remaining: self.remaining,
            });
        }
        unit_offset(self.rest(), n)
    }

    pub fn peek(&self, n: usize) -> Result<&'a str, PreconditionError> {
        let len = self.span(n)?;
        Ok(&self.rest()[..len])
    }

    pub fn take(&mut self, n: usize) -> Result<&'a str, PreconditionError> {
        let len = self.span(n)?;
        let out = &self.rest()[..len];
        self.pos += len;
        self.remaining -= n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), PreconditionError> {
        self.take(n).map(|_| ())
    }

    /// Length of the unconsumed text up to and including the next newline.
    pub fn chars_through_newline(&self) -> Option<usize> {
        let rest = self.rest();
        rest.find('\n').map(|i| utf16_len(&rest[..i]) + 1)
    }
}
