//! The changeset wire form and ways to build one.
//!
//! ```text
//! Z:<old length><'>' or '<'><|length change|><ops>$<char bank>
//! ```
//!
//! Lengths are base 36. The char bank holds, in order, the text of every
//! insert op.

use std::fmt;

use crate::assembler::SmartOpAssembler;
use crate::attribs::Attribs;
use crate::base36;
use crate::error::{FormatError, PreconditionError};
use crate::op::{Op, OpCode};
use crate::string_iter::{split_at_unit, utf16_len};

/// A decoded changeset header with borrowed ops and char bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changeset<'a> {
    pub old_len: usize,
    pub new_len: usize,
    pub ops: &'a str,
    pub char_bank: &'a str,
}

impl fmt::Display for Changeset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Z:")?;
        base36::write(f, self.old_len)?;
        if self.new_len >= self.old_len {
            f.write_str(">")?;
            base36::write(f, self.new_len - self.old_len)?;
        } else {
            f.write_str("<")?;
            base36::write(f, self.old_len - self.new_len)?;
        }
        f.write_str(self.ops)?;
        f.write_str("$")?;
        f.write_str(self.char_bank)
    }
}

fn header_number<'a>(cs: &str, rest: &'a str) -> Result<(usize, &'a str), FormatError> {
    let end = rest
        .bytes()
        .position(|b| !base36::is_digit(b))
        .unwrap_or(rest.len());
    if end == 0 {
        return Err(FormatError::NotAChangeset(cs.to_string()));
    }
    Ok((base36::decode(&rest[..end])?, &rest[end..]))
}

/// Splits a changeset into header lengths, ops and char bank.
pub fn unpack(cs: &str) -> Result<Changeset<'_>, FormatError> {
    let rest = cs
        .strip_prefix("Z:")
        .ok_or_else(|| FormatError::NotAChangeset(cs.to_string()))?;
    let (old_len, rest) = header_number(cs, rest)?;
    let (grows, rest) = match rest.as_bytes().first() {
        Some(b'>') => (true, &rest[1..]),
        Some(b'<') => (false, &rest[1..]),
        _ => return Err(FormatError::NotAChangeset(cs.to_string())),
    };
    let (change, rest) = header_number(cs, rest)?;
    let new_len = if grows {
        old_len
            .checked_add(change)
            .ok_or_else(|| FormatError::NotAChangeset(cs.to_string()))?
    } else {
        old_len
            .checked_sub(change)
            .ok_or(FormatError::NegativeLength {
                old_len,
                shrink: change,
            })?
    };
    let dollar = rest.find('$').ok_or(FormatError::MissingBank)?;
    Ok(Changeset {
        old_len,
        new_len,
        ops: &rest[..dollar],
        char_bank: &rest[dollar + 1..],
    })
}

/// Encodes a changeset.
pub fn pack(old_len: usize, new_len: usize, ops: &str, char_bank: &str) -> String {
    Changeset {
        old_len,
        new_len,
        ops,
        char_bank,
    }
    .to_string()
}

pub fn old_len(cs: &str) -> Result<usize, FormatError> {
    Ok(unpack(cs)?.old_len)
}

pub fn new_len(cs: &str) -> Result<usize, FormatError> {
    Ok(unpack(cs)?.new_len)
}

/// The changeset that leaves a document of length `n` untouched.
pub fn identity(n: usize) -> String {
    pack(n, n, "", "")
}

pub fn is_identity(cs: &str) -> Result<bool, FormatError> {
    let unpacked = unpack(cs)?;
    Ok(unpacked.ops.is_empty() && unpacked.old_len == unpacked.new_len)
}

/// Changeset that replaces `ndel` chars of `orig` at `start` with `ins`.
/// `start` and `ndel` are clamped to the text; a cut inside a surrogate
/// pair is an error.
pub fn make_splice(
    orig: &str,
    start: usize,
    ndel: usize,
    ins: &str,
    attribs: &Attribs,
) -> Result<String, PreconditionError> {
    let orig_len = utf16_len(orig);
    let start = start.min(orig_len);
    let ndel = ndel.min(orig_len - start);
    let (pre, rest) = split_at_unit(orig, start)?;
    let (removed, _) = split_at_unit(rest, ndel)?;

    let mut assem = SmartOpAssembler::new();
    assem.append_op_with_text(OpCode::Keep, pre, &Attribs::new());
    assem.append_op_with_text(OpCode::Remove, removed, &Attribs::new());
    assem.append_op_with_text(OpCode::Insert, ins, attribs);
    assem.end_document();
    let new_len = orig_len - ndel + utf16_len(ins);
    Ok(pack(orig_len, new_len, &assem.serialize(), ins))
}

/// Incremental changeset construction against a document of known length.
///
/// ```
/// use easysync::{Attribs, Builder};
///
/// let mut b = Builder::new(6);
/// b.keep(3, 0, &Attribs::new()).remove(1, 0).insert("XY", &Attribs::new());
/// assert_eq!(b.build().unwrap(), "Z:6>1=3-1+2$XY");
/// ```
#[derive(Debug, Clone)]
pub struct Builder {
    old_len: usize,
    assem: SmartOpAssembler,
    char_bank: String,
}

impl Builder {
    pub fn new(old_len: usize) -> Self {
        Self {
            old_len,
            assem: SmartOpAssembler::new(),
            char_bank: String::new(),
        }
    }

    /// Keeps `n` chars spanning `l` newlines, applying `attribs` to them.
    pub fn keep(&mut self, n: usize, l: usize, attribs: &Attribs) -> &mut Self {
        self.assem
            .append(&Op::new(OpCode::Keep, n, l, attribs.clone()));
        self
    }

    /// Keeps the chars of `text`, which must match the document.
    pub fn keep_text(&mut self, text: &str, attribs: &Attribs) -> &mut Self {
        self.assem.append_op_with_text(OpCode::Keep, text, attribs);
        self
    }

    pub fn insert(&mut self, text: &str, attribs: &Attribs) -> &mut Self {
        self.assem.append_op_with_text(OpCode::Insert, text, attribs);
        self.char_bank.push_str(text);
        self
    }

    pub fn remove(&mut self, n: usize, l: usize) -> &mut Self {
        self.assem.append(&Op::remove(n, l));
        self
    }

    /// Packs the changeset. Fails if the ops remove more than the document
    /// holds.
    pub fn build(mut self) -> Result<String, FormatError> {
        self.assem.end_document();
        let change = self.assem.length_change();
        let new_len =
            self.old_len
                .checked_add_signed(change)
                .ok_or(FormatError::NegativeLength {
                    old_len: self.old_len,
                    shrink: change.unsigned_abs(),
                })?;
        Ok(pack(
            self.old_len,
            new_len,
            &self.assem.serialize(),
            &self.char_bank,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_reads_header() {
        let cs = unpack("Z:z>9*0=1=4-3+9=1|1-4-4+1*0+a$123456789abcdefghijk").unwrap();
        assert_eq!(cs.old_len, 35);
        assert_eq!(cs.new_len, 44);
        assert_eq!(cs.ops, "*0=1=4-3+9=1|1-4-4+1*0+a");
        assert_eq!(cs.char_bank, "123456789abcdefghijk");

        let cs = unpack("Z:bc<6|x=b4|2-6$").unwrap();
        assert_eq!((cs.old_len, cs.new_len), (408, 402));
    }

    #[test]
    fn unpack_rejects_malformed_headers() {
        assert!(matches!(unpack("Y:1>0$"), Err(FormatError::NotAChangeset(_))));
        assert!(matches!(unpack("Z:>0$"), Err(FormatError::NotAChangeset(_))));
        assert!(matches!(unpack("Z:1=0$"), Err(FormatError::NotAChangeset(_))));
        assert!(matches!(unpack("Z:1>$"), Err(FormatError::NotAChangeset(_))));
        assert!(matches!(unpack("Z:01>0$"), Err(FormatError::Number(_))));
        assert_eq!(unpack("Z:1>0=1"), Err(FormatError::MissingBank));
        assert_eq!(
            unpack("Z:1<2$"),
            Err(FormatError::NegativeLength {
                old_len: 1,
                shrink: 2
            })
        );
    }

    #[test]
    fn pack_chooses_sign() {
        assert_eq!(pack(10, 3, "-7", ""), "Z:a<7-7$");
        assert_eq!(pack(3, 10, "+7", "abcdefg"), "Z:3>7+7$abcdefg");
        assert_eq!(identity(5), "Z:5>0$");
        assert!(is_identity(&identity(5)).unwrap());
        assert!(!is_identity("Z:5>0=1$").unwrap());
    }

    #[test]
    fn splice_inside_and_at_end() {
        assert_eq!(
            make_splice("a\nb\nc\n", 5, 0, "def", &Attribs::new()).unwrap(),
            "Z:6>3|2=4=1+3$def"
        );
        assert_eq!(make_splice("123", 3, 0, "456", &Attribs::new()).unwrap(), "Z:3>3=3+3$456");
        assert_eq!(make_splice("abc", 1, 10, "", &Attribs::new()).unwrap(), "Z:3<2=1-2$");
    }

    #[test]
    fn builder_with_attributes() {
        let bold = Attribs::sorted([0]);
        let mut b = Builder::new(4);
        b.keep_text("ab\n", &Attribs::new())
            .keep(1, 0, &bold)
            .insert("x\ny", &bold);
        assert_eq!(b.build().unwrap(), "Z:4>3|1=3*0=1*0|1+2*0+1$x\ny");
    }

    #[test]
    fn builder_rejects_removing_more_than_the_document() {
        let mut b = Builder::new(2);
        b.remove(3, 0);
        assert_eq!(
            b.build(),
            Err(FormatError::NegativeLength {
                old_len: 2,
                shrink: 3
            })
        );
    }

    #[test]
    fn splice_counts_astral_chars_as_two_units() {
        let cs = make_splice("a😀b", 3, 1, "", &Attribs::new()).unwrap();
        assert_eq!(cs, "Z:4<1=3-1$");
        assert_eq!(
            make_splice("a😀b", 2, 1, "", &Attribs::new()),
            Err(PreconditionError::SplitsSurrogatePair { at: 2 })
        );
    }
}
