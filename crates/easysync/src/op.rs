//! Ops and the op stream codec.
//!
//! An op token is `(*<attrib>)*(|<lines>)?<opcode><chars>` with every number
//! in base 36. A stream of tokens ends at the end of input or at the `$`
//! that starts a changeset's char bank.

use std::fmt;

use crate::attribs::Attribs;
use crate::base36;
use crate::error::ParseError;
use crate::string_iter::utf16_len;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// `=` keep chars of the old document, optionally changing attributes.
    Keep,
    /// `+` insert chars taken from the char bank.
    Insert,
    /// `-` remove chars of the old document.
    Remove,
}

impl OpCode {
    pub fn as_char(self) -> char {
        match self {
            OpCode::Keep => '=',
            OpCode::Insert => '+',
            OpCode::Remove => '-',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '=' => Some(OpCode::Keep),
            '+' => Some(OpCode::Insert),
            '-' => Some(OpCode::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpCode::Keep => "=",
            OpCode::Insert => "+",
            OpCode::Remove => "-",
        })
    }
}

/// One run of a changeset or attribution string.
///
/// `lines` counts the newlines inside the run; when it is non-zero the run
/// ends with a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub opcode: OpCode,
    pub chars: usize,
    pub lines: usize,
    pub attribs: Attribs,
}

impl Op {
    pub fn new(opcode: OpCode, chars: usize, lines: usize, attribs: Attribs) -> Self {
        Self {
            opcode,
            chars,
            lines,
            attribs,
        }
    }

    pub fn keep(chars: usize, lines: usize) -> Self {
        Self::new(OpCode::Keep, chars, lines, Attribs::new())
    }

    pub fn insert(chars: usize, lines: usize) -> Self {
        Self::new(OpCode::Insert, chars, lines, Attribs::new())
    }

    pub fn remove(chars: usize, lines: usize) -> Self {
        Self::new(OpCode::Remove, chars, lines, Attribs::new())
    }

    pub fn with_attribs(mut self, attribs: Attribs) -> Self {
        self.attribs = attribs;
        self
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.attribs, f)?;
        if self.lines > 0 {
            f.write_str("|")?;
            base36::write(f, self.lines)?;
        }
        fmt::Display::fmt(&self.opcode, f)?;
        base36::write(f, self.chars)
    }
}

// ── Stream decoding ──────────────────────────────────────────────────────

/// Lazy iterator over the ops of an op string.
///
/// A clone is an independent cursor at the same position; call
/// [`deserialize_ops`] again to start over. After the first error the
/// iterator is exhausted.
#[derive(Debug, Clone)]
pub struct OpIter<'a> {
    ops: &'a str,
    pos: usize,
    done: bool,
}

pub fn deserialize_ops(ops: &str) -> OpIter<'_> {
    OpIter {
        ops,
        pos: 0,
        done: false,
    }
}

impl<'a> OpIter<'a> {
    fn digits(&mut self) -> &'a str {
        let bytes = self.ops.as_bytes();
        let start = self.pos;
        while self.pos < bytes.len() && base36::is_digit(bytes[self.pos]) {
            self.pos += 1;
        }
        &self.ops[start..self.pos]
    }

    fn invalid(&mut self, offset: usize) -> ParseError {
        self.done = true;
        ParseError::InvalidOperation {
            offset,
            rest: self.ops[offset..].to_string(),
        }
    }

    fn number(&mut self, offset: usize) -> Result<&'a str, ParseError> {
        let digits = self.digits();
        if digits.is_empty() {
            return Err(self.invalid(offset));
        }
        Ok(digits)
    }

    fn parse_op(&mut self) -> Result<Op, ParseError> {
        let bytes = self.ops.as_bytes();
        let start = self.pos;

        let mut attribs = Attribs::new();
        while bytes.get(self.pos) == Some(&b'*') {
            self.pos += 1;
            let digits = self.number(start)?;
            attribs.push(base36::decode_u32(digits)?);
        }

        let mut lines = 0;
        if bytes.get(self.pos) == Some(&b'|') {
            self.pos += 1;
            lines = base36::decode(self.number(start)?)?;
        }

        let opcode = match bytes.get(self.pos) {
            Some(b'=') => OpCode::Keep,
            Some(b'+') => OpCode::Insert,
            Some(b'-') => OpCode::Remove,
            _ => return Err(self.invalid(start)),
        };
        self.pos += 1;
        let chars = base36::decode(self.number(start)?)?;

        Ok(Op {
            opcode,
            chars,
            lines,
            attribs,
        })
    }
}

impl Iterator for OpIter<'_> {
    type Item = Result<Op, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.ops.len() {
            return None;
        }
        if self.ops.as_bytes()[self.pos] == b'$' {
            self.done = true;
            return None;
        }
        let op = self.parse_op();
        if op.is_err() {
            self.done = true;
        }
        Some(op)
    }
}

/// Ops covering `text`: one op for text without a newline, otherwise one op
/// through the last newline and one op for whatever follows it (possibly
/// zero chars, which assemblers drop).
pub fn ops_from_text(opcode: OpCode, text: &str, attribs: &Attribs) -> impl Iterator<Item = Op> {
    let (first, rest) = match text.rfind('\n') {
        None => (Op::new(opcode, utf16_len(text), 0, attribs.clone()), None),
        Some(last_newline) => {
            let (head, tail) = text.split_at(last_newline + 1);
            let lines = head.matches('\n').count();
            let first = Op::new(opcode, utf16_len(head), lines, attribs.clone());
            let rest = Op::new(opcode, utf16_len(tail), 0, attribs.clone());
            (first, Some(rest))
        }
    };
    std::iter::once(first).chain(rest)
}
